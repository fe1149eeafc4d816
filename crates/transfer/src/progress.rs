use std::sync::Arc;

pub type ProgressId = u64;

/// Consumed interface for surfacing transfer progress.
///
/// The engine begins one entry per transfer, advances it as bytes are read,
/// flips the merging sub-state while chunks are being reassembled, and
/// removes the entry when the transfer is over. Return values beyond the id
/// are never inspected.
pub trait ProgressReporter: Send + Sync {
    fn begin(&self, total_size: i64, action: &str, name: &str) -> ProgressId;

    fn advance(&self, id: ProgressId, bytes: u64);

    fn set_merging(&self, id: ProgressId, merging: bool);

    fn remove(&self, id: ProgressId);
}

/// Removes the progress entry when dropped, on every exit path.
pub(crate) struct ProgressGuard {
    reporter: Arc<dyn ProgressReporter>,
    id: ProgressId,
}

impl ProgressGuard {
    pub(crate) fn begin(
        reporter: Arc<dyn ProgressReporter>,
        total_size: i64,
        action: &str,
        name: &str,
    ) -> Self {
        let id = reporter.begin(total_size, action, name);
        Self { reporter, id }
    }

    pub(crate) fn id(&self) -> ProgressId {
        self.id
    }

    pub(crate) fn advance(&self, bytes: u64) {
        self.reporter.advance(self.id, bytes);
    }

    pub(crate) fn set_merging(&self, merging: bool) {
        self.reporter.set_merging(self.id, merging);
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.reporter.remove(self.id);
    }
}
