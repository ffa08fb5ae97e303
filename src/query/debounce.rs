use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

type BoxedAction = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Coalesces bursts of input-change notifications into a single invocation
/// of the bound action per quiet window.
///
/// Every `notify` cancels the previously scheduled invocation and re-arms
/// the timer, so only the last notification in a burst fires, at
/// `last_notify + quiet_interval`. There is no leading-edge invocation. The
/// action runs on the runtime and reads whatever state is current at fire
/// time, not a snapshot captured when `notify` was called.
pub struct QueryDebouncer {
    quiet_interval: Duration,
    action: BoxedAction,
    // Cancellation handle for the scheduled-but-not-yet-fired invocation.
    // Once the timer fires, cancelling has no effect on the running action.
    pending: Mutex<Option<oneshot::Sender<()>>>,
}

impl QueryDebouncer {
    pub fn new<A, Fut>(quiet_interval: Duration, action: A) -> Self
    where
        A: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            quiet_interval,
            action: Arc::new(move || {
                Box::pin(action()) as Pin<Box<dyn Future<Output = ()> + Send>>
            }),
            pending: Mutex::new(None),
        }
    }

    /// Record that input changed now. Cancels any scheduled invocation and
    /// schedules a new one at `now + quiet_interval`. Must be called from
    /// within a tokio runtime.
    pub fn notify(&self) {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let action = Arc::clone(&self.action);
        let quiet_interval = self.quiet_interval;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => {
                    debug!("Scheduled query invocation cancelled before firing.");
                }
                _ = tokio::time::sleep(quiet_interval) => {
                    action().await;
                }
            }
        });

        let mut pending = self.pending.lock().unwrap();
        if let Some(previous) = pending.replace(cancel_tx) {
            // Send failure means the previous invocation already fired.
            let _ = previous.send(());
        }
    }

    /// Cancel a scheduled invocation without firing it. No-op when nothing
    /// is scheduled. Used on view teardown.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().unwrap().take() {
            let _ = pending.send(());
        }
    }
}

impl Drop for QueryDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
