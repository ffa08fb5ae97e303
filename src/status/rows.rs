use serde::Serialize;

use crate::api::models::CheckSummary;
use crate::config::Thresholds;

/// Severity bucket for colouring a row's average-success cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    NoRuns,
    /// Per-row fan-in mode only: the row's statistics could not be fetched.
    Unknown,
}

/// One row of the check list table: the check's identity plus its fetched
/// statistics, or the per-row failure reason in per-row fan-in mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckRow {
    pub name: String,
    pub environment: String,
    pub enabled: bool,
    pub stats: Result<CheckSummary, String>,
}

impl CheckRow {
    pub fn average_success(&self) -> Option<f64> {
        self.stats.as_ref().ok().and_then(|s| s.average_success)
    }

    pub fn latest_status(&self) -> Option<bool> {
        self.stats.as_ref().ok().and_then(|s| s.latest_status)
    }

    /// "No runs" when the check never ran, otherwise a percentage with four
    /// significant digits, collapsing to "100%" above 99.99%.
    pub fn average_success_label(&self) -> String {
        match &self.stats {
            Err(_) => "Unavailable".to_string(),
            Ok(stats) => match stats.average_success {
                None => "No runs".to_string(),
                Some(value) if value >= 0.9999 => "100%".to_string(),
                Some(value) => format!("{}%", format_significant(value * 100.0)),
            },
        }
    }

    pub fn latest_status_label(&self) -> &'static str {
        match &self.stats {
            Err(_) => "Unavailable",
            Ok(stats) => match stats.latest_status {
                Some(true) => "Success",
                Some(false) => "Failed",
                None => "Not run",
            },
        }
    }

    pub fn enabled_label(&self) -> &'static str {
        if self.enabled { "Enabled" } else { "Disabled" }
    }

    pub fn severity(&self, thresholds: &Thresholds) -> Severity {
        let Ok(stats) = &self.stats else {
            return Severity::Unknown;
        };
        match stats.average_success {
            None => Severity::NoRuns,
            Some(value) => {
                let percent = value * 100.0;
                if percent <= thresholds.critical {
                    Severity::Critical
                } else if percent <= thresholds.warning {
                    Severity::Warning
                } else {
                    Severity::Ok
                }
            }
        }
    }
}

/// Published state of the check list table. Replaced wholesale by each
/// aggregation run; never mutated in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TableState {
    /// No aggregation has published yet.
    #[default]
    NotLoaded,
    Ready(Vec<CheckRow>),
    /// The whole refresh failed under the all-or-nothing policy.
    Failed(String),
}

impl TableState {
    pub fn rows(&self) -> Option<&[CheckRow]> {
        match self {
            TableState::Ready(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Four significant digits, matching the dashboard's percentage rendering:
/// 99.5 -> "99.50", 5.0 -> "5.000", 0.5 -> "0.5000".
fn format_significant(value: f64) -> String {
    if value <= 0.0 {
        return "0.000".to_string();
    }
    let decimals = (3 - value.log10().floor() as i64).clamp(0, 10) as usize;
    format!("{value:.decimals$}")
}
