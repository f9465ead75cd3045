//! ConverseBridge model capabilities
//!
//! Resolves context length, output limit and reasoning support for a model id
//! from a third-party model catalog, cached in memory with a TTL.

pub mod cache;
pub mod catalog;
pub mod resolver;

pub use cache::TtlCache;
pub use catalog::{CatalogModel, CatalogSource, HttpCatalogSource};
pub use resolver::{CapabilityRecord, CapabilityResolver, ModelProperties};
