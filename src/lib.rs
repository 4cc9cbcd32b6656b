//! Ferry — session-aware remote file copy.
//!
//! Declarative datasets, BLAKE3 verification, deterministic teardown of
//! session-backed sources.

pub mod cli;
pub mod core;
pub mod source;
