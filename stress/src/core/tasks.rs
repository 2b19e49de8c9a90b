use tokio::task::{AbortHandle, JoinHandle};

/// Aborts the tracked tasks when dropped.
///
/// Spawned tasks outlive a cancelled parent future; workers still holding a
/// record lock would otherwise block the final kill of every process.
#[derive(Default)]
pub(crate) struct AbortOnDrop(Vec<AbortHandle>);

impl AbortOnDrop {
    pub(crate) fn track<T>(&mut self, handle: &JoinHandle<T>) {
        self.0.push(handle.abort_handle());
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}
