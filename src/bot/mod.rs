pub mod commands;
pub mod handler;
pub mod start;

pub use start::{init_bot, start_bot, BotState};
