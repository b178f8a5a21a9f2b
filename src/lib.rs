//! Ghostline: advisor personas over a generative-text API.
//!
//! The core is conversation-context management: each feature keeps an
//! append-only transcript, bounds it to a window before every request,
//! renders it into a feature template, and parses the reply (sometimes as
//! structured JSON) back into feature state.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod providers;

pub mod conversation;
pub mod dispatch;
pub mod prompt;
pub mod session;
pub mod structured;

pub mod features;
