//! rowmark-core: streaming row indexing for large text streams.
//!
//! This crate turns arbitrary chunks of a text stream into marker-annotated
//! rows, keeps a byte/row offset index of everything produced, and tells a
//! consumer about it through rate-limited notifications.
//!
//! # Architecture
//!
//! ```text
//! chunk ──► Transformer ──► OffsetMap
//!               │
//!               ├──► Throttle<StreamUpdate> ──┐
//!               │                             ├──► Notifier
//!               └──► ProgressState ───────────┘
//!                     (Throttle<ProgressUpdate>)
//! ```
//!
//! A [`StreamSession`] owns one of each for a single stream; a
//! [`SessionRegistry`] keeps several isolated sessions. Everything for one
//! stream is driven sequentially; only the throttle timers run as tokio
//! tasks.

pub mod config;
pub mod markers;
pub mod notifier;
pub mod offset_map;
pub mod progress;
pub mod registry;
pub mod session;
pub mod throttle;
pub mod transform;
pub mod types;

pub use notifier::{Notifier, NotifyError};
pub use offset_map::OffsetMap;
pub use progress::ProgressState;
pub use registry::SessionRegistry;
pub use session::{PipeSummary, SessionSettings, StreamSession};
pub use throttle::{Throttle, ThrottlePolicy};
pub use transform::{RestPolicy, Transformer};
pub use types::{
    Chunk, Notification, OffsetEntry, ProgressUpdate, Range, SourceId, StreamId, StreamUpdate,
    TransformResult,
};
