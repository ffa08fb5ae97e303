use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Failed to submit manual trigger for {name}/{environment}: {source}")]
    Submit {
        name: String,
        environment: String,
        #[source]
        source: ApiError,
    },
}

/// Lifecycle state of one manual run request.
///
/// `Resolved` and `Failed` are terminal; everything in between is driven by
/// the polling loop. Submission itself is the awaited `submit` call; the
/// session only exists once the backend has accepted the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerState {
    /// Trigger accepted; the remote scheduler has not reported yet.
    Scheduling,
    /// Opaque intermediate state reported by the backend, e.g. "PENDING".
    Remote(String),
    /// The run is observable; carries its identifier.
    Resolved(String),
    /// Polling budget exhausted before resolution.
    Failed(String),
}

impl TriggerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TriggerState::Resolved(_) | TriggerState::Failed(_))
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Scheduling => write!(f, "SCHEDULING"),
            TriggerState::Remote(state) => write!(f, "{state}"),
            TriggerState::Resolved(_) => write!(f, "RESOLVED"),
            TriggerState::Failed(_) => write!(f, "FAILED"),
        }
    }
}

/// Cadence and budget for the trigger polling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub base_interval: Duration,
    pub backoff_factor: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(30),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    /// Interval to wait before poll number `attempt` (zero-based).
    fn interval_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(attempt.min(32) as i32);
        let scaled = self.base_interval.as_secs_f64() * factor;
        Duration::from_secs_f64(scaled.min(self.max_interval.as_secs_f64()))
    }
}

/// One manual run request's lifecycle, from accepted submission until the
/// run becomes observable.
///
/// Owned exclusively by the view that created it. The polling loop is
/// strictly sequential (each poll awaits the previous response before the
/// next is scheduled) and stops on a terminal state or on teardown. An
/// in-flight poll may still complete after teardown; its result is
/// discarded.
pub struct TriggerSession {
    check_name: String,
    environment: String,
    trigger_id: String,
    state: Arc<Mutex<TriggerState>>,
    cancelled: Arc<AtomicBool>,
    shutdown: Option<oneshot::Sender<()>>,
    poll_task: Option<JoinHandle<()>>,
}

impl TriggerSession {
    /// Submit a manual run request; on success the session is `Scheduling`
    /// and its polling loop is running. On failure no session is created
    /// and the caller may simply submit again.
    pub async fn submit<C: ApiClient + 'static>(
        client: Arc<C>,
        name: &str,
        environment: &str,
        policy: PollPolicy,
    ) -> Result<Self, TriggerError> {
        let trigger_id = client.submit_trigger(name, environment).await.map_err(
            |source| TriggerError::Submit {
                name: name.to_string(),
                environment: environment.to_string(),
                source,
            },
        )?;
        info!(
            check = name,
            environment,
            trigger_id = %trigger_id,
            "Manual run trigger accepted."
        );

        let state = Arc::new(Mutex::new(TriggerState::Scheduling));
        let cancelled = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let poll_task = tokio::spawn(poll_loop(
            client,
            name.to_string(),
            environment.to_string(),
            trigger_id.clone(),
            policy,
            Arc::clone(&state),
            Arc::clone(&cancelled),
            shutdown_rx,
        ));

        Ok(Self {
            check_name: name.to_string(),
            environment: environment.to_string(),
            trigger_id,
            state,
            cancelled,
            shutdown: Some(shutdown_tx),
            poll_task: Some(poll_task),
        })
    }

    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// The trigger id assigned by the backend on submission.
    pub fn trigger_id(&self) -> &str {
        &self.trigger_id
    }

    pub fn state(&self) -> TriggerState {
        self.state.lock().unwrap().clone()
    }

    /// The run id, once the trigger has resolved.
    pub fn resolved_run_id(&self) -> Option<String> {
        match &*self.state.lock().unwrap() {
            TriggerState::Resolved(run_id) => Some(run_id.clone()),
            _ => None,
        }
    }

    /// Stop scheduling further polls. An in-flight poll request may still
    /// complete; its result is discarded.
    pub fn teardown(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(shutdown) = self.shutdown.take() {
            // Send failure means the loop already exited on its own.
            let _ = shutdown.send(());
        }
        self.poll_task.take();
    }
}

impl Drop for TriggerSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_loop<C: ApiClient>(
    client: Arc<C>,
    name: String,
    environment: String,
    trigger_id: String,
    policy: PollPolicy,
    state: Arc<Mutex<TriggerState>>,
    cancelled: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut attempt: u32 = 0;
    loop {
        if attempt >= policy.max_attempts {
            warn!(
                check = %name,
                environment = %environment,
                trigger_id = %trigger_id,
                attempts = attempt,
                "Manual trigger did not resolve within the polling budget."
            );
            *state.lock().unwrap() = TriggerState::Failed(format!(
                "Trigger {trigger_id} not resolved after {attempt} polls"
            ));
            break;
        }

        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                debug!(trigger_id = %trigger_id, "Trigger polling loop received shutdown signal.");
                break;
            }
            _ = tokio::time::sleep(policy.interval_for(attempt)) => {}
        }

        // One poll at a time; the next is only scheduled once this response
        // has arrived.
        let response = client.poll_trigger(&name, &environment, &trigger_id).await;
        if cancelled.load(Ordering::SeqCst) {
            debug!(trigger_id = %trigger_id, "Discarding poll response for torn-down session.");
            break;
        }
        attempt += 1;

        match response {
            Ok(poll) => {
                if let Some(run_id) = poll.id {
                    info!(trigger_id = %trigger_id, run_id = %run_id, "Manual trigger resolved to run.");
                    *state.lock().unwrap() = TriggerState::Resolved(run_id);
                    break;
                }
                debug!(trigger_id = %trigger_id, state = %poll.state, "Manual trigger still in progress.");
                *state.lock().unwrap() = TriggerState::Remote(poll.state);
            }
            Err(e) => {
                // A single failed poll does not end the session; it only
                // consumes part of the attempt budget.
                warn!(trigger_id = %trigger_id, error = %e, "Trigger status poll failed; will retry.");
            }
        }
    }
}
