use std::time::Duration;

use async_trait::async_trait;
use oilsight_core::{AssetPayload, DashboardError, SamplePayload};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{ApiConfig, Endpoint, ReferenceSource};

const MAX_ERROR_BODY: usize = 200;

/// Thin JSON client for the dashboard REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, DashboardError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| DashboardError::Network(err.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, DashboardError> {
        debug!(path = %path, "GET");
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(network_error)?;
        read_json(response).await
    }

    pub async fn post_json<T>(&self, path: &str, body: &T) -> Result<Value, DashboardError>
    where
        T: Serialize + ?Sized,
    {
        debug!(path = %path, "POST");
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        read_json(response).await
    }

    pub async fn create_asset(&self, payload: &AssetPayload) -> Result<Value, DashboardError> {
        self.post_json(Endpoint::Assets.path(), payload).await
    }

    pub async fn create_sample(&self, payload: &SamplePayload) -> Result<Value, DashboardError> {
        self.post_json(Endpoint::Samples.path(), payload).await
    }
}

#[async_trait]
impl ReferenceSource for ApiClient {
    async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, DashboardError> {
        self.get_json(endpoint.path()).await
    }
}

fn network_error(err: reqwest::Error) -> DashboardError {
    DashboardError::Network(err.to_string())
}

async fn read_json(response: Response) -> Result<Value, DashboardError> {
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;

    if !status.is_success() {
        return Err(DashboardError::Http {
            status: status.as_u16(),
            message: error_excerpt(&body),
        });
    }

    parse_body(&body)
}

fn parse_body(body: &str) -> Result<Value, DashboardError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|err| DashboardError::Parse(format!("response is not JSON: {err}")))
}

fn error_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY {
        return trimmed.to_string();
    }
    let mut excerpt: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
    excerpt.push('…');
    excerpt
}
