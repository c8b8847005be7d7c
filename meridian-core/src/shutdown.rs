//! Shutdown signal and traits, mirrored from the teacher's
//! `core/src/shutdown.rs`. Used by the Order Engine's (C7) and Execution
//! Tracker's (C8) teardown sequences, per spec.md §4.3 "Shutdown".

use std::future::Future;

/// Components that shut down immediately, without awaiting anything.
pub trait SyncShutdown {
    type Result;
    fn shutdown(&mut self) -> Self::Result;
}

/// Components whose shutdown performs async work (draining queues,
/// cancelling in-flight orders, flushing state to the store).
pub trait AsyncShutdown {
    type Result;
    fn shutdown(&mut self) -> impl Future<Output = Self::Result>;
}

/// A shutdown signal, publishable through the event bus as `EMERGENCY_STOP`
/// or used directly to drive a `tokio::sync::watch` cooperative-cancel
/// channel (spec.md §5).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shutdown;
