//! Carillon Audio - Bell Playback
//!
//! Thin wrapper over `rodio` that plays the configured bell sound on
//! the default output device. The scheduler treats playback as an
//! opaque job; errors here are logged by the caller, never surfaced as
//! scheduling errors.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod output;

pub use error::{Error, Result};
pub use output::BellPlayer;
