//! HTTP client for the daemon's API, used by the CLI.

pub mod types;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use types::{AlarmPatchRequest, AlarmState, ScheduledCallback, SnoozeResponse};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:7786";

pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_URL)
    }

    pub fn with_base_url(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v0{}", self.base_url, path)
    }

    async fn json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await.context("API request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API returned {status}: {body}");
        }
        response.json().await.context("API response malformed")
    }

    pub async fn health(&self) -> Result<String> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(response.error_for_status()?.text().await?)
    }

    pub async fn list_alarms(&self) -> Result<Vec<AlarmState>> {
        Self::json(self.http.get(self.url("/alarms"))).await
    }

    pub async fn get_alarm(&self, id: &str) -> Result<AlarmState> {
        Self::json(self.http.get(self.url(&format!("/alarms/{id}")))).await
    }

    pub async fn create_alarm(&self, request: &AlarmPatchRequest) -> Result<AlarmState> {
        Self::json(self.http.post(self.url("/alarms")).json(request)).await
    }

    pub async fn patch_alarm(&self, id: &str, request: &AlarmPatchRequest) -> Result<AlarmState> {
        Self::json(self.http.patch(self.url(&format!("/alarms/{id}"))).json(request)).await
    }

    pub async fn delete_alarm(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/alarms/{id}")))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API returned {status}: {body}");
        }
        Ok(())
    }

    pub async fn snooze(&self, id: &str) -> Result<SnoozeResponse> {
        Self::json(self.http.post(self.url(&format!("/alarms/{id}/snooze")))).await
    }

    pub async fn schedule(&self) -> Result<Vec<ScheduledCallback>> {
        Self::json(self.http.get(self.url("/schedule"))).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
