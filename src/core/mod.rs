//! Core copy-job pipeline: config schema, planning, execution, and the
//! job-scoped resource lifecycle.

pub mod closer;
pub mod executor;
pub mod journal;
pub mod manifest;
pub mod parser;
pub mod planner;
pub mod types;
pub mod verify;
