//! tg-repeater — a Telegram echo relay with a durable delivery watermark.
//!
//! Polls the Bot API for new messages, echoes each back to its chat, and
//! records every delivery so a restart resumes exactly where the previous
//! process stopped: nothing relayed twice, nothing skipped.

pub mod config;
pub mod error;
pub mod filter;
pub mod relay;
pub mod store;
pub mod telegram;
