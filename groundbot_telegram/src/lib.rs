#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Telegram front end for the grounded bot.
//!
//! Each Telegram chat is one conversation, keyed by its chat id. Citation
//! cards are sent as plain text since Telegram has no Adaptive Card support.

mod bot;
mod command;
mod context;
mod error;
mod handler;

pub use bot::TelegramBot;
pub use command::Command;
pub use context::{TelegramTurnContext, conversation_id};
pub use error::{Error, Result};
