//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the blockbridge crates:
//! - Logging and tracing initialisation
//! - Runtime error types
//!
//! The bridges themselves only emit `tracing` events; a host installs a
//! subscriber once at startup through [`logging::init_logging`].

pub mod error;
pub mod logging;

pub use error::{Error, Result};
