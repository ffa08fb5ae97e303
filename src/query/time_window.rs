use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::models::Check;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Range start {from} is after end {to}")]
pub struct InvalidRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// The reporting window summary and run queries are scoped to.
///
/// Two encodings exist depending on the active screen: the check list picks
/// a named rolling timeframe, the check detail screen picks an explicit
/// from/to range. The encodings are mutually exclusive per view; setting
/// one replaces the other wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimeWindow {
    /// No constraint; the backend reports over all retained data.
    #[default]
    AllTime,
    /// A named rolling timeframe, e.g. `1d`.
    Timeframe(String),
    /// An explicit instant range with `from <= to`.
    Range {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl TimeWindow {
    pub fn timeframe(name: impl Into<String>) -> Self {
        TimeWindow::Timeframe(name.into())
    }

    pub fn range(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, InvalidRange> {
        if from > to {
            return Err(InvalidRange { from, to });
        }
        Ok(TimeWindow::Range { from, to })
    }

    /// The named timeframe to pass to statistics endpoints, when one applies.
    pub fn timeframe_param(&self) -> Option<&str> {
        match self {
            TimeWindow::Timeframe(name) => Some(name),
            _ => None,
        }
    }

    /// The explicit instant bounds, when this window carries them.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            TimeWindow::Range { from, to } => Some((*from, *to)),
            _ => None,
        }
    }
}

/// Free-text filter plus active window for the check list screen.
///
/// Single-writer UI state: only the owning view mutates it, and every change
/// starts a new query generation that invalidates in-flight aggregations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterQuery {
    pub filter_text: String,
    pub time_window: TimeWindow,
}

impl FilterQuery {
    /// Case-insensitive substring match over check name and environment.
    /// An empty filter matches everything.
    pub fn matches(&self, check: &Check) -> bool {
        let needle = self.filter_text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        check.name.to_lowercase().contains(&needle)
            || check.environment.to_lowercase().contains(&needle)
    }
}
