use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::query::time_window::TimeWindow;

use super::ApiClient;
use super::models::{
    Check, CheckSummary, RunResult, RunSummary, Timeframe, TriggerPollResponse,
    TriggerSubmitResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `ApiClient` implementation over the dashboard's REST API.
pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    /// `base_url` points at the API root, e.g. `http://localhost:5000/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn check_url(&self, name: &str, environment: &str, suffix: &str) -> String {
        format!(
            "{}/checks/{}/environments/{}{}",
            self.base_url,
            urlencoding::encode(name),
            urlencoding::encode(environment),
            suffix
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(url = %url, "Issuing GET request.");
        let response = self.client.get(url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Query parameters for endpoints scoped by a time window. The backend
    /// takes a named timeframe for statistics and from/to instants for run
    /// listings; the all-time window sends nothing.
    fn window_params(window: &TimeWindow) -> Vec<(&'static str, String)> {
        match window {
            TimeWindow::AllTime => Vec::new(),
            TimeWindow::Timeframe(name) => vec![("timeframe", name.clone())],
            TimeWindow::Range { from, to } => vec![
                ("from_date", from.to_rfc3339()),
                ("to_date", to.to_rfc3339()),
            ],
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn list_checks(&self) -> Result<Vec<Check>, ApiError> {
        self.get_json(&format!("{}/checks", self.base_url), &[])
            .await
    }

    async fn fetch_summary(
        &self,
        name: &str,
        environment: &str,
        window: &TimeWindow,
    ) -> Result<CheckSummary, ApiError> {
        let url = self.check_url(name, environment, "/results");
        // The statistics endpoint only understands named timeframes; an
        // explicit range degrades to the all-time scope here.
        let params: Vec<(&str, String)> = match window.timeframe_param() {
            Some(timeframe) => vec![("timeframe", timeframe.to_string())],
            None => Vec::new(),
        };
        self.get_json(&url, &params).await
    }

    async fn list_runs(
        &self,
        name: &str,
        environment: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RunSummary>, ApiError> {
        let url = self.check_url(name, environment, "/runs");
        let params = Self::window_params(window);
        // The endpoint returns a map of timestamp id to result string.
        let runs: BTreeMap<String, RunResult> = self.get_json(&url, &params).await?;
        Ok(runs
            .into_iter()
            .map(|(timestamp, result)| RunSummary { timestamp, result })
            .collect())
    }

    async fn list_timeframes(&self) -> Result<Vec<Timeframe>, ApiError> {
        self.get_json(&format!("{}/result-timeframes", self.base_url), &[])
            .await
    }

    async fn submit_trigger(&self, name: &str, environment: &str) -> Result<String, ApiError> {
        let url = self.check_url(name, environment, "/trigger");
        debug!(url = %url, "Submitting manual trigger.");
        let response = self.client.post(&url).send().await?;
        let submit: TriggerSubmitResponse = Self::decode(response).await?;
        Ok(submit.id)
    }

    async fn poll_trigger(
        &self,
        name: &str,
        environment: &str,
        trigger_id: &str,
    ) -> Result<TriggerPollResponse, ApiError> {
        let url = self.check_url(
            name,
            environment,
            &format!("/trigger/{}", urlencoding::encode(trigger_id)),
        );
        self.get_json(&url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_url_escapes_path_segments() {
        let client = HttpApiClient::new("http://localhost:5000/api/v1/").unwrap();
        let url = client.check_url("my check", "prod/eu", "/results");
        assert_eq!(
            url,
            "http://localhost:5000/api/v1/checks/my%20check/environments/prod%2Feu/results"
        );
    }

    #[test]
    fn test_window_params_per_encoding() {
        assert!(HttpApiClient::window_params(&TimeWindow::AllTime).is_empty());

        let params = HttpApiClient::window_params(&TimeWindow::timeframe("1d"));
        assert_eq!(params, vec![("timeframe", "1d".to_string())]);

        let from = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let to = chrono::DateTime::parse_from_rfc3339("2026-01-08T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let params = HttpApiClient::window_params(&TimeWindow::range(from, to).unwrap());
        assert_eq!(params[0].0, "from_date");
        assert_eq!(params[1].0, "to_date");
    }
}
