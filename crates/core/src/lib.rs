//! Core domain logic for the macro-matching engine.
//!
//! This crate is storage-agnostic: it defines the catalog domain types, the
//! relevance scorer, the randomized combination search, result caching, and
//! the [`recommender::CatalogSource`] port that storage adapters implement.

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod matching;
pub mod recommender;

pub use cache::{TtlCache, DEFAULT_CACHE_TTL};
pub use config::{ConfigError, ConfigOverrides, EngineConfig, LoadOptions};
pub use domain::{
    CatalogFilter, CatalogItem, ItemId, MacroDimension, MacroTarget, MacroTotals,
    DEFAULT_FRESHNESS_DAYS,
};
pub use errors::{CatalogError, QueryError, RecommendError};
pub use matching::{
    Combination, CombinationRequest, CombinationSearch, MacroDeviation, RankRequest, RankedItem,
    RelevanceScorer, ScoringWeights, SearchConfig,
};
pub use recommender::{CatalogSource, Recommender};
