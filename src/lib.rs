//! Workspace facade crate.
//!
//! Re-exports the bridges from `core-bridge` and, with the `logging` feature
//! (on by default), the logging setup from `core-runtime`, so host
//! applications can depend on `blockbridge` alone.

pub use core_bridge::*;

#[cfg(feature = "logging")]
pub use core_runtime::logging;
