//! # Contracts
//!
//! Shared data structures for the fan-out workspace.
//! Every crate may depend on this one; it depends on no workspace crate.
//!
//! ## Time Model
//! - Deadlines are `tokio::time::Instant`s, taken when a context is created
//! - A per-job timeout starts when that job starts, never when the pool starts

mod context;
mod error;
mod job;
mod manifest;
mod options;

pub use context::ExecutionContext;
pub use error::*;
pub use job::{Job, JobMeta};
pub use manifest::*;
pub use options::FanoutOptions;
