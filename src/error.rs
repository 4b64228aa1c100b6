//! Top-level scheduler error type
//!
//! Invalid-usage errors are fatal: the scheduler cannot proceed safely once
//! one of them has been raised, and callers are expected to propagate them
//! rather than retry. Internal-inconsistency errors are assertion-class bugs
//! — they abort via `debug_assert!` in debug builds and are only returned as
//! a value in release builds.

use thiserror::Error;

/// Errors the scheduler's public API can return.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A scheduler API was called from within a system or worker thread.
    #[error("scheduler API called from a worker thread")]
    InvalidFromWorker,

    /// A mutating operation (e.g. `deactivate_systems`) was called while a
    /// frame is in progress.
    #[error("mutating operation called while a frame is in progress")]
    InvalidWhileIterating,

    /// `set_pipeline` was given a handle with no pipeline descriptor.
    #[error("entity {0:?} has no PipelineQuery descriptor")]
    InvalidParameter(crate::ecs::entity::Entity),

    /// `frame_begin` was invoked with `user_delta == 0` and no time source.
    #[error("frame_begin called with no delta and no time source")]
    MissingTimeSource,

    /// An internal invariant was violated: either a forced merge's
    /// re-evaluation requested another merge, or iterator-recover could not
    /// locate the resuming entity. This is an assertion-class bug.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

/// Result alias used throughout the scheduler's public API.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
