use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiClient;
use crate::query::debounce::QueryDebouncer;
use crate::query::time_window::{FilterQuery, TimeWindow};
use crate::status::{FanInPolicy, StatusAggregator, TableState};

/// Orchestrates the check list screen: owns the filter state, the
/// debouncer and the aggregator, and exposes the published table.
///
/// Filter and timeframe edits are coalesced through the debouncer; the
/// refresh that eventually fires reads the query state current at fire
/// time. Teardown cancels any pending debounced refresh.
pub struct CheckListScreen<C: ApiClient + 'static> {
    aggregator: Arc<StatusAggregator<C>>,
    debouncer: QueryDebouncer,
}

impl<C: ApiClient + 'static> CheckListScreen<C> {
    pub fn new(client: Arc<C>, quiet_interval: Duration, policy: FanInPolicy) -> Self {
        let aggregator = Arc::new(StatusAggregator::new(client, policy));
        let aggregator_for_action = Arc::clone(&aggregator);
        let debouncer = QueryDebouncer::new(quiet_interval, move || {
            let aggregator = Arc::clone(&aggregator_for_action);
            async move {
                aggregator.refresh().await;
            }
        });
        Self {
            aggregator,
            debouncer,
        }
    }

    /// Entry point for filter keystrokes.
    pub fn set_filter_text(&self, text: impl Into<String>) {
        self.aggregator.set_filter_text(text);
        self.debouncer.notify();
    }

    /// Entry point for timeframe / range selection.
    pub fn set_time_window(&self, window: TimeWindow) {
        self.aggregator.set_time_window(window);
        self.debouncer.notify();
    }

    /// Replace the whole query without debouncing, e.g. with the screen's
    /// initial state on mount. Pair with `refresh_now`.
    pub fn reset_query(&self, query: FilterQuery) {
        self.aggregator.set_query(query);
    }

    /// Immediate, undebounced refresh; used for the initial load.
    pub async fn refresh_now(&self) {
        self.aggregator.refresh().await;
    }

    pub fn query(&self) -> FilterQuery {
        self.aggregator.query()
    }

    pub fn table(&self) -> TableState {
        self.aggregator.table()
    }

    /// View teardown: cancel any pending debounced refresh.
    pub fn teardown(&self) {
        self.debouncer.cancel();
    }
}
