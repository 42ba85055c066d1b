#![warn(
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

//! Turn processing for the grounded chat bot.
//!
//! Each inbound message is answered by replaying the stored conversation to
//! the completion service with the search data source attached, then
//! recording the answer and relaying its citations.
//!
//! # Flow
//! - load history, append the user turn
//! - build the request and call the completion service
//! - normalize citation markers, append the assistant turn, persist
//! - reply with the text, then a citation card when sources came back

mod bot;

pub use bot::{BotSettings, GroundedBot, TurnError};
