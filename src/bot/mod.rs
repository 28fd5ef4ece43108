//! Chat behaviour: classification, replies, content selection and the
//! scheduled broadcast.

pub mod broadcast;
pub mod conversation;
pub mod intent;
pub mod scheduler;
pub mod selector;
