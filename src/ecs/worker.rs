//! Worker pool barrier.
//!
//! The scheduler is single-threaded cooperative: it drives a frame from one
//! thread and only ever blocks at three points — opening/closing a worker
//! epoch and the inter-group barrier. What happens to component storage
//! between `worker_begin` and `worker_end` is this trait's implementer's
//! business; the driver only needs to know, at each barrier, whether the
//! run query's match set changed underneath it.

/// Contract the frame driver consumes at the three points it may suspend.
pub trait WorkerPool {
    /// Open a frame epoch, before the first system of the frame runs.
    fn worker_begin(&mut self);

    /// Close the frame epoch, after the last system of the frame ran.
    fn worker_end(&mut self);

    /// The inter-group merge barrier. Returns `true` iff the run query's
    /// match set changed as a result of whatever happened during the
    /// barrier (e.g. deferred structural changes flushing), which forces
    /// the frame driver to recover its iterator.
    fn worker_sync(&mut self) -> bool;
}

/// The default worker pool: no actual worker threads, groups execute
/// entirely on the driver thread. A structural change is only reported if
/// something told this pool about one first — see
/// [`SequentialWorkerPool::notify_structural_change`]. Sufficient for an
/// embedder with no background worker threads, and for tests that want to
/// script exactly when a merge invalidates the iterator.
#[derive(Debug, Default)]
pub struct SequentialWorkerPool {
    pending_structural_change: bool,
}

impl SequentialWorkerPool {
    /// Create a pool with no pending structural change.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending_structural_change: false,
        }
    }

    /// Mark that the next `worker_sync` should report a match-set change.
    /// Consumed (reset to false) the next time `worker_sync` is called.
    pub fn notify_structural_change(&mut self) {
        self.pending_structural_change = true;
    }
}

impl WorkerPool for SequentialWorkerPool {
    fn worker_begin(&mut self) {
        log::trace!("worker epoch begin");
    }

    fn worker_end(&mut self) {
        log::trace!("worker epoch end");
    }

    fn worker_sync(&mut self) -> bool {
        std::mem::replace(&mut self.pending_structural_change, false)
    }
}

/// A worker pool backed by a bounded channel, for embedders that do flush
/// deferred structural changes (component add/remove) from background
/// worker threads. Those threads call [`StructuralChangeHandle::notify`]
/// when they make a change; `worker_sync` drains the channel and reports
/// whether anything arrived since the last barrier.
///
/// Generalizes the bounded-channel thread pool pattern used elsewhere in
/// this codebase for fanning work across workers, repurposed here for a
/// single bit of signal rather than arbitrary closures.
pub struct ChannelWorkerPool {
    receiver: crossbeam::channel::Receiver<()>,
    sender: crossbeam::channel::Sender<()>,
}

impl ChannelWorkerPool {
    /// Create a pool with room for `capacity` buffered notifications
    /// before a sender would block.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam::channel::bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// A cloneable handle worker threads can use to report a structural
    /// change without holding a reference to the pool itself.
    #[must_use]
    pub fn handle(&self) -> StructuralChangeHandle {
        StructuralChangeHandle {
            sender: self.sender.clone(),
        }
    }
}

impl WorkerPool for ChannelWorkerPool {
    fn worker_begin(&mut self) {
        log::trace!("worker epoch begin");
    }

    fn worker_end(&mut self) {
        log::trace!("worker epoch end");
        // Drain any notifications that arrived after the last barrier but
        // before epoch close, so they don't leak into the next frame.
        while self.receiver.try_recv().is_ok() {}
    }

    fn worker_sync(&mut self) -> bool {
        let mut changed = false;
        while self.receiver.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}

/// A handle a worker thread can use to report a structural change to a
/// [`ChannelWorkerPool`].
#[derive(Clone)]
pub struct StructuralChangeHandle {
    sender: crossbeam::channel::Sender<()>,
}

impl StructuralChangeHandle {
    /// Report that a structural change happened.
    pub fn notify(&self) {
        // A full channel just means a change was already pending; dropping
        // this one is harmless since `worker_sync` only needs to know
        // "at least one happened", not how many.
        let _ = self.sender.try_send(());
    }
}
