//! Shared foundation for the maitre reservation assistant.
//!
//! Holds the conversation vocabulary (intents, entities, messages), the
//! top-level error type and the TOML configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::MaitreConfig;
pub use error::{MaitreError, Result};
pub use types::*;
