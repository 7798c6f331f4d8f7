//! Shared HTTP plumbing for provider clients.

use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use super::types::ProviderError;

/// Thin base holding the pieces every provider client needs.
#[derive(Clone)]
pub struct HttpProviderBase {
    pub id: &'static str,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub http: Client,
}

impl HttpProviderBase {
    pub fn new(id: &'static str, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            id,
            endpoint,
            api_key,
            http: Client::new(),
        }
    }

    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// POST a JSON payload and return the raw JSON response. Non-2xx statuses
    /// become provider errors carrying the response body; undecodable bodies
    /// become protocol errors.
    pub async fn post_json<Req>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &Req,
    ) -> Result<Value, ProviderError>
    where
        Req: Serialize,
    {
        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::network(self.id, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(self.id, e))?;

        if !status.is_success() {
            return Err(ProviderError::status(self.id, status.as_u16(), text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::protocol(self.id, format!("invalid JSON body: {e}")))
    }

    pub fn require_api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_api_key(self.id))
    }
}
