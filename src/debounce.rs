use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delay between the last keystroke and the user search request.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Single-slot deferred task: scheduling a new task aborts the previous one,
/// so only the most recent schedule ever runs.
pub struct Debouncer {
    delay: Duration,
    slot: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer { delay, slot: None }
    }

    /// Run `task` after the quiet period unless something else is scheduled first.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.slot.take() {
            handle.abort();
        }
    }

    /// True while a scheduled task has not yet finished.
    pub fn is_pending(&self) -> bool {
        self.slot.as_ref().map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
