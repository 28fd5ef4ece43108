#![forbid(unsafe_code)]

//! `cheeseday` — a Messenger bot that tells a cheese joke a day.

pub mod bot;
pub mod config;
pub mod errors;
pub mod messenger;
pub mod models;
pub mod persistence;
pub mod server;
pub mod state;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
