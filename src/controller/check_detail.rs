use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::ApiClient;
use crate::api::models::RunSummary;
use crate::error::ApiError;
use crate::query::time_window::{InvalidRange, TimeWindow};
use crate::trigger::{PollPolicy, TriggerError, TriggerSession, TriggerState};

/// Orchestrates one check's detail screen: run history over an explicit
/// instant range, and exclusive ownership of the manual trigger session.
///
/// At most one trigger session exists per screen; submitting again replaces
/// (and tears down) the previous one. Tearing down the screen tears down
/// the session with it, so no background poll outlives the view.
pub struct CheckDetailScreen<C: ApiClient + 'static> {
    client: Arc<C>,
    check_name: String,
    environment: String,
    poll_policy: PollPolicy,
    window: Mutex<TimeWindow>,
    trigger: Mutex<Option<TriggerSession>>,
}

impl<C: ApiClient + 'static> CheckDetailScreen<C> {
    pub fn new(
        client: Arc<C>,
        check_name: impl Into<String>,
        environment: impl Into<String>,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            client,
            check_name: check_name.into(),
            environment: environment.into(),
            poll_policy,
            window: Mutex::new(TimeWindow::AllTime),
            trigger: Mutex::new(None),
        }
    }

    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Scope run history to an explicit instant range. Replaces whatever
    /// window was active before.
    pub fn set_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<(), InvalidRange> {
        *self.window.lock().unwrap() = TimeWindow::range(from, to)?;
        Ok(())
    }

    pub fn window(&self) -> TimeWindow {
        self.window.lock().unwrap().clone()
    }

    /// Run history for the active window, newest first.
    pub async fn run_history(&self) -> Result<Vec<RunSummary>, ApiError> {
        let window = self.window();
        let mut runs = self
            .client
            .list_runs(&self.check_name, &self.environment, &window)
            .await?;
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    /// Submit a manual run for this check. Replaces any previous session;
    /// on submit failure no session exists and the caller may retry.
    pub async fn trigger_run(&self) -> Result<(), TriggerError> {
        let session = TriggerSession::submit(
            Arc::clone(&self.client),
            &self.check_name,
            &self.environment,
            self.poll_policy.clone(),
        )
        .await?;
        // Dropping a replaced session tears its polling loop down.
        *self.trigger.lock().unwrap() = Some(session);
        Ok(())
    }

    /// State of the active trigger session, if one exists.
    pub fn trigger_state(&self) -> Option<TriggerState> {
        self.trigger
            .lock()
            .unwrap()
            .as_ref()
            .map(TriggerSession::state)
    }

    /// The run id of a resolved trigger, once observable.
    pub fn resolved_run_id(&self) -> Option<String> {
        self.trigger
            .lock()
            .unwrap()
            .as_ref()
            .and_then(TriggerSession::resolved_run_id)
    }

    /// View teardown: stop the trigger session's polling loop.
    pub fn teardown(&self) {
        if let Some(session) = self.trigger.lock().unwrap().take() {
            debug!(
                check = %self.check_name,
                environment = %self.environment,
                trigger_id = session.trigger_id(),
                "Tearing down trigger session with its screen."
            );
            drop(session);
        }
    }
}

impl<C: ApiClient + 'static> Drop for CheckDetailScreen<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::sleep;

    use crate::api::models::{
        Check, CheckSummary, RunResult, Timeframe, TriggerPollResponse,
    };

    struct DetailBackend {
        runs: BTreeMap<String, RunResult>,
        polls: AtomicU32,
        submits: AtomicU32,
    }

    impl DetailBackend {
        fn new(runs: BTreeMap<String, RunResult>) -> Self {
            Self {
                runs,
                polls: AtomicU32::new(0),
                submits: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ApiClient for DetailBackend {
        async fn list_checks(&self) -> Result<Vec<Check>, ApiError> {
            Ok(Vec::new())
        }

        async fn fetch_summary(
            &self,
            _name: &str,
            _environment: &str,
            _window: &TimeWindow,
        ) -> Result<CheckSummary, ApiError> {
            Ok(CheckSummary::default())
        }

        async fn list_runs(
            &self,
            _name: &str,
            _environment: &str,
            _window: &TimeWindow,
        ) -> Result<Vec<RunSummary>, ApiError> {
            Ok(self
                .runs
                .iter()
                .map(|(timestamp, result)| RunSummary {
                    timestamp: timestamp.clone(),
                    result: *result,
                })
                .collect())
        }

        async fn list_timeframes(&self) -> Result<Vec<Timeframe>, ApiError> {
            Ok(Vec::new())
        }

        async fn submit_trigger(&self, _name: &str, _environment: &str) -> Result<String, ApiError> {
            let id = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("trigger-{id}"))
        }

        async fn poll_trigger(
            &self,
            _name: &str,
            _environment: &str,
            _trigger_id: &str,
        ) -> Result<TriggerPollResponse, ApiError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(TriggerPollResponse {
                state: "PENDING".to_string(),
                id: None,
            })
        }
    }

    fn runs_fixture() -> BTreeMap<String, RunResult> {
        BTreeMap::from([
            ("2026-01-01_00-00-00".to_string(), RunResult::Success),
            ("2026-01-02_00-00-00".to_string(), RunResult::Failed),
            ("2026-01-03_00-00-00".to_string(), RunResult::Success),
        ])
    }

    fn policy() -> PollPolicy {
        PollPolicy {
            base_interval: Duration::from_secs(1),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(1),
            max_attempts: 100,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_history_is_newest_first() {
        let client = Arc::new(DetailBackend::new(runs_fixture()));
        let screen = CheckDetailScreen::new(client, "ping", "prod", policy());

        let runs = screen.run_history().await.unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].timestamp, "2026-01-03_00-00-00");
        assert_eq!(runs[2].timestamp, "2026-01-01_00-00-00");
        assert_eq!(runs[1].result, RunResult::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_replaces_previous_session() {
        let client = Arc::new(DetailBackend::new(BTreeMap::new()));
        let screen = CheckDetailScreen::new(Arc::clone(&client), "ping", "prod", policy());

        screen.trigger_run().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        let polls_from_first = client.polls.load(Ordering::SeqCst);
        assert!(polls_from_first >= 1);

        screen.trigger_run().await.unwrap();
        assert_eq!(client.submits.load(Ordering::SeqCst), 2);

        // Only the second session keeps polling.
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(screen.trigger_state(), Some(TriggerState::Remote("PENDING".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_background_polling() {
        let client = Arc::new(DetailBackend::new(BTreeMap::new()));
        let screen = CheckDetailScreen::new(Arc::clone(&client), "ping", "prod", policy());

        screen.trigger_run().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        screen.teardown();
        let polled_before = client.polls.load(Ordering::SeqCst);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(client.polls.load(Ordering::SeqCst), polled_before);
        assert_eq!(screen.trigger_state(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_range_validates_bounds() {
        let client = Arc::new(DetailBackend::new(BTreeMap::new()));
        let screen = CheckDetailScreen::new(client, "ping", "prod", policy());

        let from = DateTime::parse_from_rfc3339("2026-01-08T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let to = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(screen.set_range(from, to).is_err());
        assert_eq!(screen.window(), TimeWindow::AllTime);

        assert!(screen.set_range(to, from).is_ok());
        assert!(screen.window().bounds().is_some());
    }
}
