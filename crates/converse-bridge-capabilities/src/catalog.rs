//! Third-party model catalog
//!
//! The catalog lists models under vendor-prefixed ids (`anthropic/claude-3.5-sonnet`)
//! with their context length, completion limit and supported request parameters.

use converse_bridge_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CATALOG_URL: &str = "https://openrouter.ai/api/v1/models";

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogModel {
    pub id: String,
    #[serde(default)]
    pub context_length: Option<u64>,
    #[serde(default)]
    pub top_provider: Option<TopProvider>,
    #[serde(default)]
    pub supported_parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopProvider {
    #[serde(default)]
    pub max_completion_tokens: Option<u64>,
}

impl CatalogModel {
    /// Id with the vendor prefix removed
    pub fn base_id(&self) -> &str {
        self.id
            .split_once('/')
            .map(|(_, model)| model)
            .unwrap_or(&self.id)
    }

    pub fn supports_reasoning(&self) -> bool {
        self.supported_parameters
            .iter()
            .any(|p| p == "reasoning" || p == "include_reasoning")
    }

    pub fn max_output_tokens(&self) -> Option<u64> {
        self.top_provider
            .as_ref()
            .and_then(|provider| provider.max_completion_tokens)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogPayload {
    Wrapped { data: Vec<CatalogModel> },
    Bare(Vec<CatalogModel>),
}

impl CatalogPayload {
    fn into_models(self) -> Vec<CatalogModel> {
        match self {
            CatalogPayload::Wrapped { data } => data,
            CatalogPayload::Bare(models) => models,
        }
    }
}

/// Source of catalog entries
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_models(&self) -> Result<Vec<CatalogModel>>;
}

/// Fetches the catalog over HTTP
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpCatalogSource {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_URL, Duration::from_secs(30))
    }
}

#[async_trait::async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_models(&self) -> Result<Vec<CatalogModel>> {
        debug!("Fetching model catalog from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Catalog(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Catalog(format!("HTTP error: {}", response.status())));
        }

        let payload: CatalogPayload = response
            .json()
            .await
            .map_err(|e| Error::Catalog(format!("invalid catalog payload: {}", e)))?;

        Ok(payload.into_models())
    }
}
