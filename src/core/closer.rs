//! Job-scoped lifecycle tracking for session-backed resources.
//!
//! A copy job acquires sources over its lifetime (one SSH session per
//! remote dataset); each is registered here at the point of acquisition
//! and released exactly once when the job shuts down. Teardown runs in
//! reverse acquisition order, never stops at an individual failure, and
//! reports every cause it collected.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::warn;

/// Anything holding external state (a socket, a session) that must be
/// released exactly once. Release may fail with an I/O-style error.
pub trait Closeable: Send + Sync {
    /// Stable label used in teardown diagnostics.
    fn name(&self) -> &str;

    /// Release the resource. Implementations should tolerate a second
    /// call; a duplicate registration will close twice.
    fn close(&self) -> io::Result<()>;
}

/// A single resource's close failure.
#[derive(Debug, Error)]
#[error("failed to close {resource}: {source}")]
pub struct ReleaseError {
    /// Label of the resource that failed to close
    pub resource: String,
    /// Underlying I/O failure
    #[source]
    pub source: io::Error,
}

/// Outcome of a terminal release with at least one failure.
#[derive(Debug, Error)]
pub enum CloseError {
    /// Exactly one resource failed to close.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// Two or more resources failed to close; every cause is preserved.
    #[error("{} resources failed to close", .failures.len())]
    Aggregate { failures: Vec<ReleaseError> },
}

impl CloseError {
    /// All underlying failures, in close (reverse-registration) order.
    pub fn failures(&self) -> &[ReleaseError] {
        match self {
            Self::Release(e) => std::slice::from_ref(e),
            Self::Aggregate { failures } => failures,
        }
    }
}

#[derive(Default)]
struct Registry {
    handles: Vec<Arc<dyn Closeable>>,
    closed: bool,
}

/// Accumulates acquired resources and releases them all on one terminal
/// [`close_all`](ResourceCloser::close_all) call.
///
/// One instance per job. `register` is safe to call from concurrent
/// work-unit threads sharing the job's closer. A `register` that races
/// with or follows `close_all` is accepted but its resource is not
/// closed by this closer; the gap is logged at warning level.
#[derive(Default)]
pub struct ResourceCloser {
    inner: Mutex<Registry>,
}

impl ResourceCloser {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock leaves the registry intact;
        // keep draining rather than poisoning teardown.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a resource for terminal release and hand it back, so the
    /// call site can register inline at the point of acquisition:
    ///
    /// ```ignore
    /// let session = closer.register(SftpSession::open(name, endpoint)?);
    /// ```
    pub fn register<C>(&self, resource: C) -> Arc<C>
    where
        C: Closeable + 'static,
    {
        let handle = Arc::new(resource);
        self.register_shared(&handle);
        handle
    }

    /// Register an already-shared handle. Duplicate registration is
    /// permitted; the resource will be closed once per registration.
    pub fn register_shared<C>(&self, handle: &Arc<C>)
    where
        C: Closeable + 'static,
    {
        let mut inner = self.lock();
        if inner.closed {
            warn!(
                resource = handle.name(),
                "registered after close_all; resource will not be closed by this closer"
            );
            return;
        }
        inner.handles.push(handle.clone() as Arc<dyn Closeable>);
    }

    /// Number of resources currently awaiting release.
    pub fn pending(&self) -> usize {
        self.lock().handles.len()
    }

    /// Whether the terminal release has already run.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Release every registered resource, last-acquired first.
    ///
    /// Closes run sequentially; an individual failure is logged and
    /// recorded, and the remaining resources are still closed. A single
    /// failure is surfaced directly, multiple failures as an aggregate
    /// carrying every cause. A second call is a no-op returning `Ok`.
    pub fn close_all(&self) -> Result<(), CloseError> {
        let drained = {
            let mut inner = self.lock();
            if inner.closed {
                return Ok(());
            }
            inner.closed = true;
            std::mem::take(&mut inner.handles)
        };

        // Lock released before closing: a close may block on the network.
        let mut failures: Vec<ReleaseError> = Vec::new();
        for handle in drained.iter().rev() {
            if let Err(source) = handle.close() {
                warn!(resource = handle.name(), error = %source, "failed to close resource");
                failures.push(ReleaseError {
                    resource: handle.name().to_string(),
                    source,
                });
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(CloseError::Release(failures.remove(0))),
            _ => Err(CloseError::Aggregate { failures }),
        }
    }
}
