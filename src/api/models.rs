use serde::{Deserialize, Serialize};

/// A synthetic check bound to an environment, as returned by the check listing.
///
/// Identity is the `(name, environment)` pair. The listing is the source of
/// truth; rows are never mutated locally, only replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub environment: String,
    #[serde(rename = "enable")]
    pub enabled: bool,
}

/// Per-check run statistics scoped to the active time window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckSummary {
    /// Fraction of successful runs in `[0, 1]`; `None` when there are no runs.
    pub average_success: Option<f64>,
    /// Outcome of the most recent run; `None` when the check has not run.
    pub latest_status: Option<bool>,
}

/// Result of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResult {
    Success,
    Failed,
    InternalError,
    Timeout,
    Running,
    NotRun,
}

impl RunResult {
    pub fn label(&self) -> &'static str {
        match self {
            RunResult::Success => "Success",
            RunResult::Failed => "Failed",
            RunResult::InternalError => "Internal error",
            RunResult::Timeout => "Timed out",
            RunResult::Running => "Running",
            RunResult::NotRun => "Not run",
        }
    }

    /// Completed runs that count against the check.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunResult::Failed | RunResult::Timeout | RunResult::InternalError
        )
    }
}

/// One run of a check, identified by its timestamp id within the
/// `(name, environment)` it belongs to. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub result: RunResult,
}

/// A named rolling timeframe offered by the backend, e.g. `1d` / "1 Day".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub name: String,
    pub friendly_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSubmitResponse {
    pub id: String,
}

/// Response from the manual trigger status endpoint.
///
/// A present `id` means the run is observable and the trigger is resolved;
/// otherwise `state` carries the backend's opaque intermediate state string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerPollResponse {
    pub state: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_listing_wire_shape() {
        let raw = r#"[{"name": "ping", "environment": "prod", "enable": true}]"#;
        let checks: Vec<Check> = serde_json::from_str(raw).unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "ping");
        assert_eq!(checks[0].environment, "prod");
        assert!(checks[0].enabled);
    }

    #[test]
    fn test_summary_null_fields() {
        let raw = r#"{"average_success": null, "latest_status": null}"#;
        let summary: CheckSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.average_success, None);
        assert_eq!(summary.latest_status, None);
    }

    #[test]
    fn test_run_result_wire_names() {
        assert_eq!(
            serde_json::from_str::<RunResult>(r#""INTERNAL_ERROR""#).unwrap(),
            RunResult::InternalError
        );
        assert_eq!(
            serde_json::from_str::<RunResult>(r#""NOT_RUN""#).unwrap(),
            RunResult::NotRun
        );
    }

    #[test]
    fn test_run_result_labels() {
        assert_eq!(RunResult::Success.label(), "Success");
        assert_eq!(RunResult::Timeout.label(), "Timed out");
        assert_eq!(RunResult::InternalError.label(), "Internal error");
        assert!(RunResult::Timeout.is_failure());
        assert!(!RunResult::Running.is_failure());
    }

    #[test]
    fn test_trigger_poll_response_without_id() {
        let raw = r#"{"state": "PENDING"}"#;
        let response: TriggerPollResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.state, "PENDING");
        assert_eq!(response.id, None);
    }
}
