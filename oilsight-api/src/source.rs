use std::fmt;

use async_trait::async_trait;
use oilsight_core::{CascadeLevel, DashboardError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection settings for the dashboard backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

/// Backend collections the dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Organizations,
    Sites,
    Assets,
    SamplingPoints,
    Users,
    Samples,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Organizations => "organizations",
            Endpoint::Sites => "sites",
            Endpoint::Assets => "assets",
            Endpoint::SamplingPoints => "sampling-points",
            Endpoint::Users => "users",
            Endpoint::Samples => "samples",
        }
    }

    pub fn for_level(level: CascadeLevel) -> Self {
        match level {
            CascadeLevel::Organization => Endpoint::Organizations,
            CascadeLevel::Site => Endpoint::Sites,
            CascadeLevel::Asset => Endpoint::Assets,
            CascadeLevel::SamplingPoint => Endpoint::SamplingPoints,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Organizations => "organizations",
            Endpoint::Sites => "sites",
            Endpoint::Assets => "assets",
            Endpoint::SamplingPoints => "sampling points",
            Endpoint::Users => "users",
            Endpoint::Samples => "samples",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Anything that can hand back the raw JSON of a backend collection.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, DashboardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_endpoints() {
        assert_eq!(
            Endpoint::for_level(CascadeLevel::SamplingPoint),
            Endpoint::SamplingPoints
        );
        assert_eq!(Endpoint::Users.to_string(), "users");
    }
}
