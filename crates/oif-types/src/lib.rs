//! Shared types for the OIF settlement core.
//!
//! This crate holds the data model exchanged between the encoding library,
//! the output settler and the oracles: mandate outputs, fill descriptions,
//! call context, events, configuration and the payload-creator seam that
//! oracle adapters use to validate payloads before broadcasting them.

pub mod abi;
pub mod config;
pub mod events;
pub mod output;
pub mod payload;
pub mod primitives;
pub mod serde_helpers;
pub mod validation;

pub use config::*;
pub use events::*;
pub use output::*;
pub use payload::*;
pub use primitives::*;
pub use validation::*;
