//! Lifetime-tracked wrappers for native debugger interfaces.
//!
//! This crate re-exports [`cordebug_core`], prelude included; see its
//! documentation for the wrapper model. The `testing` feature exposes the
//! in-process native simulator and `logging` a ready-made `tracing` subscriber.

pub use cordebug_core::*;

#[cfg(feature = "logging")]
pub mod logging;
