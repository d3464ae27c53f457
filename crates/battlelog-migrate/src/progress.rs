//! Progress notifications
//!
//! Observers are called synchronously, in processing order, on the task that
//! runs the import. Passing [`NoProgress`] changes nothing else about a run.

use battlelog_common::types::RecordKind;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Processing of a record kind is starting
    KindStarted { kind: RecordKind },
    /// A batch of records finished; `processed` counts from the start of the kind
    BatchProcessed {
        kind: RecordKind,
        processed: usize,
        total: usize,
    },
    /// Every kind finished
    Completed { elapsed_ms: u64 },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::KindStarted { kind } => write!(f, "Migrating {}...", kind.label()),
            ProgressEvent::BatchProcessed {
                kind,
                processed,
                total,
            } => write!(f, "{}: processed {}/{}", kind.label(), processed, total),
            ProgressEvent::Completed { elapsed_ms } => {
                write!(f, "Migration completed in {}ms", elapsed_ms)
            },
        }
    }
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Logs every event at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        info!("{}", event);
    }
}
