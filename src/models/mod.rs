//! Domain model module declarations.

pub mod event;
pub mod joke;
pub mod reply;
pub mod user;
