//! A website maintenance agent that assembles the file and git tools with a
//! conversation partner.
//!
//! The crate includes a CLI tool that replays a recorded conversation
//! against a website checkout, and renders recorded conversations for
//! reading. You can also use it as a library to
//! drive the agent with any [`PartnerProvider`](sitebot_model::PartnerProvider).

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod session;
pub mod tools;
pub mod transcript;

pub use config::{Config, ConfigBuilder, DEFAULT_LOG_DIR, DEFAULT_SYSTEM_PROMPT};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`sitebot_core`] crate.
pub mod core {
    pub use sitebot_core::*;
}
