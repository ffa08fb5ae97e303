use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future;
use tracing::{debug, error};

use crate::api::ApiClient;
use crate::api::models::Check;
use crate::error::ApiError;
use crate::query::time_window::{FilterQuery, TimeWindow};

pub mod rows;

pub use rows::{CheckRow, Severity, TableState};

/// How per-check fetch failures fold into the published table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanInPolicy {
    /// Any failed fetch fails the whole refresh; no partial table.
    #[default]
    Atomic,
    /// Always publish a full row set; failed rows carry the error.
    PerRow,
}

/// Produces one consistent table of check rows enriched with run statistics
/// for the active time window.
///
/// Each refresh fans out one summary fetch per check, all concurrently in
/// flight, and assembles the rows in input order regardless of completion
/// order. Every query change starts a new generation; a refresh launched
/// under an older generation discards its result instead of publishing, so
/// a slow stale fetch can never overwrite the table produced by a newer
/// filter or timeframe.
pub struct StatusAggregator<C: ApiClient> {
    client: Arc<C>,
    policy: FanInPolicy,
    query: Mutex<FilterQuery>,
    generation: AtomicU64,
    published: Mutex<TableState>,
}

impl<C: ApiClient> StatusAggregator<C> {
    pub fn new(client: Arc<C>, policy: FanInPolicy) -> Self {
        Self {
            client,
            policy,
            query: Mutex::new(FilterQuery::default()),
            generation: AtomicU64::new(0),
            published: Mutex::new(TableState::NotLoaded),
        }
    }

    /// Replace the filter text. Starts a new query generation when the
    /// value actually changes; returns whether it did.
    pub fn set_filter_text(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        let mut query = self.query.lock().unwrap();
        if query.filter_text == text {
            return false;
        }
        query.filter_text = text;
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Replace the time window. Setting a named timeframe discards any
    /// explicit range and vice versa. Starts a new generation when the
    /// value actually changes; returns whether it did.
    pub fn set_time_window(&self, window: TimeWindow) -> bool {
        let mut query = self.query.lock().unwrap();
        if query.time_window == window {
            return false;
        }
        query.time_window = window;
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Replace the whole query, e.g. with the initial state on mount.
    pub fn set_query(&self, new_query: FilterQuery) -> bool {
        let mut query = self.query.lock().unwrap();
        if *query == new_query {
            return false;
        }
        *query = new_query;
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }

    pub fn query(&self) -> FilterQuery {
        self.query.lock().unwrap().clone()
    }

    /// The currently published table. Replaced wholesale by each refresh
    /// that survives the generation check.
    pub fn table(&self) -> TableState {
        self.published.lock().unwrap().clone()
    }

    /// Run one aggregation against the query state current at call time.
    ///
    /// The query and generation are captured once at launch; the fetches
    /// run against that snapshot while later query edits merely invalidate
    /// the eventual publish.
    pub async fn refresh(&self) {
        let (query, generation) = {
            let query = self.query.lock().unwrap().clone();
            (query, self.generation.load(Ordering::SeqCst))
        };

        match self.aggregate(&query).await {
            Ok(rows) => self.publish(generation, TableState::Ready(rows)),
            Err(e) => {
                error!(error = %e, "Check status aggregation failed.");
                self.publish(generation, TableState::Failed(e.to_string()));
            }
        }
    }

    async fn aggregate(&self, query: &FilterQuery) -> Result<Vec<CheckRow>, ApiError> {
        let checks: Vec<Check> = self
            .client
            .list_checks()
            .await?
            .into_iter()
            .filter(|check| query.matches(check))
            .collect();

        debug!(checks = checks.len(), "Fanning out summary fetches.");
        let fetches = checks.iter().map(|check| {
            self.client
                .fetch_summary(&check.name, &check.environment, &query.time_window)
        });

        let rows = match self.policy {
            FanInPolicy::Atomic => {
                let summaries = future::try_join_all(fetches).await?;
                checks
                    .into_iter()
                    .zip(summaries)
                    .map(|(check, summary)| CheckRow {
                        name: check.name,
                        environment: check.environment,
                        enabled: check.enabled,
                        stats: Ok(summary),
                    })
                    .collect()
            }
            FanInPolicy::PerRow => {
                let outcomes = future::join_all(fetches).await;
                checks
                    .into_iter()
                    .zip(outcomes)
                    .map(|(check, outcome)| CheckRow {
                        name: check.name,
                        environment: check.environment,
                        enabled: check.enabled,
                        stats: outcome.map_err(|e| e.to_string()),
                    })
                    .collect()
            }
        };
        Ok(rows)
    }

    fn publish(&self, launched_generation: u64, table: TableState) {
        let mut published = self.published.lock().unwrap();
        let current = self.generation.load(Ordering::SeqCst);
        if current != launched_generation {
            debug!(
                launched = launched_generation,
                current, "Discarding stale aggregation result."
            );
            return;
        }
        *published = table;
    }
}
