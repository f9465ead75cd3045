//! Capability resolution
//!
//! Answers capability questions for a model id by fuzzy-matching it against
//! the cached catalog. Both ids are normalized (region prefix dropped,
//! lowercased, `.` as `-`) and match when either contains the other; the first
//! match in catalog order wins. Catalog failures never surface to callers: an
//! unresolvable model simply has no reasoning support and no limit overrides.

use crate::cache::TtlCache;
use crate::catalog::{CatalogModel, CatalogSource};
use converse_bridge_core::{Result, model_id::normalize_for_matching};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default wait before retrying a failed catalog fetch
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Cached capabilities of one catalog model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityRecord {
    pub context_length: Option<u64>,
    pub max_output_tokens: Option<u64>,
    pub supports_reasoning: bool,
}

impl From<&CatalogModel> for CapabilityRecord {
    fn from(model: &CatalogModel) -> Self {
        Self {
            context_length: model.context_length,
            max_output_tokens: model.max_output_tokens(),
            supports_reasoning: model.supports_reasoning(),
        }
    }
}

/// Limit overrides for a model; `None` means use static defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelProperties {
    pub context_length: Option<u64>,
    pub max_output_tokens: Option<u64>,
}

pub struct CapabilityResolver {
    source: Arc<dyn CatalogSource>,
    cache: TtlCache<CapabilityRecord>,
    failure_backoff: Duration,
    last_failure: Mutex<Option<Instant>>,
}

impl CapabilityResolver {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            cache: TtlCache::new(),
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
            last_failure: Mutex::new(None),
        }
    }

    /// Use a cache with a custom TTL
    pub fn with_cache(mut self, cache: TtlCache<CapabilityRecord>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    pub fn cache(&self) -> &TtlCache<CapabilityRecord> {
        &self.cache
    }

    pub async fn supports_reasoning(&self, model_id: &str) -> bool {
        self.lookup(model_id)
            .await
            .is_some_and(|record| record.supports_reasoning)
    }

    pub async fn get_properties(&self, model_id: &str) -> ModelProperties {
        self.lookup(model_id)
            .await
            .map(|record| ModelProperties {
                context_length: record.context_length,
                max_output_tokens: record.max_output_tokens,
            })
            .unwrap_or_default()
    }

    /// Matching catalog record, refreshing the cache first when it is not valid
    pub async fn lookup(&self, model_id: &str) -> Option<CapabilityRecord> {
        self.ensure_fresh().await;

        let query = normalize_for_matching(model_id);
        if query.is_empty() {
            return None;
        }

        let found = self.cache.find(|key, _| {
            let key = normalize_for_matching(key);
            !key.is_empty() && (key.contains(&query) || query.contains(&key))
        });

        match found {
            Some((key, record)) => {
                debug!(model = %model_id, catalog_id = %key, "Resolved model capabilities");
                Some(record)
            }
            None => {
                debug!(model = %model_id, "No catalog entry matches model");
                None
            }
        }
    }

    /// Fetch the catalog and replace the cache. Returns the number of entries cached.
    pub async fn refresh(&self) -> Result<usize> {
        let models = self.source.fetch_models().await?;
        let entries: Vec<(String, CapabilityRecord)> = models
            .iter()
            .map(|model| (model.base_id().to_string(), CapabilityRecord::from(model)))
            .collect();
        let count = entries.len();
        self.cache.set_all(entries);
        Ok(count)
    }

    async fn ensure_fresh(&self) {
        if self.cache.is_valid() || self.in_backoff() {
            return;
        }

        match self.refresh().await {
            Ok(0) => {
                warn!("Model catalog is empty, using default capabilities");
                self.record_failure();
            }
            Ok(count) => debug!("Cached {} catalog models", count),
            Err(e) => {
                warn!("Failed to fetch model catalog, using default capabilities: {}", e);
                self.record_failure();
            }
        }
    }

    fn in_backoff(&self) -> bool {
        self.last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some_and(|at| at.elapsed() < self.failure_backoff)
    }

    fn record_failure(&self) {
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
    }
}
