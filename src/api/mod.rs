use async_trait::async_trait;

use crate::error::ApiError;
use crate::query::time_window::TimeWindow;

pub mod http;
pub mod models;

use models::{Check, CheckSummary, RunSummary, Timeframe, TriggerPollResponse};

/// Remote operations the orchestration core consumes.
///
/// The backend owns the wire shapes; implementations translate them into the
/// model types. Every call is a suspension point and may fail with a
/// transport or backend error.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// All registered checks, sorted by name server-side.
    async fn list_checks(&self) -> Result<Vec<Check>, ApiError>;

    /// Run statistics for one check, scoped to the given time window.
    async fn fetch_summary(
        &self,
        name: &str,
        environment: &str,
        window: &TimeWindow,
    ) -> Result<CheckSummary, ApiError>;

    /// Run history for one check within the given time window.
    async fn list_runs(
        &self,
        name: &str,
        environment: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RunSummary>, ApiError>;

    /// Named timeframes the backend can scope statistics to.
    async fn list_timeframes(&self) -> Result<Vec<Timeframe>, ApiError>;

    /// Request a manual run; returns the trigger id assigned by the backend.
    async fn submit_trigger(&self, name: &str, environment: &str) -> Result<String, ApiError>;

    /// Current state of a previously submitted manual trigger.
    async fn poll_trigger(
        &self,
        name: &str,
        environment: &str,
        trigger_id: &str,
    ) -> Result<TriggerPollResponse, ApiError>;
}
