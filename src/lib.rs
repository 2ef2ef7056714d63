//! rowmark: streaming row indexer for large text and log streams.
//!
//! The binary reads one feed (stdin, a file, or a spawned process), turns it
//! into marker-annotated rows with a byte/row offset index, and reports
//! progress through throttled notifications. The pipeline layers live in
//! [`rowmark_core`] and [`rowmark_feeds`]; this crate only wires them up.
//!
//! # Architecture
//!
//! ```text
//! Feed ──► StreamSession ──► output file
//!               │
//!               └──► Notifier ──► JSON lines on stdout
//! ```

pub mod app;
pub mod output;

pub use app::{run, Input, RunOptions};
pub use rowmark_core::*;
