//! Shared test utilities for rowmark integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Timing-sensitive helpers work with
//! `tokio::time::pause()`.

pub mod assertions;
pub mod builders;
pub mod fake_process;
pub mod fixtures;

pub use builders::*;
pub use fake_process::*;
pub use fixtures::*;
