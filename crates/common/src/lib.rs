//! Common types for the Suno cookie relay

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
