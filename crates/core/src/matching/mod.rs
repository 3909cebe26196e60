//! Macro-target matching: relevance scoring for single items and the
//! randomized greedy combination search, plus their request/result types.

mod scoring;
mod search;
mod types;

pub use scoring::{RelevanceScorer, ScoringWeights};
pub use search::{CombinationSearch, SearchConfig};
pub use types::{Combination, CombinationRequest, MacroDeviation, RankRequest, RankedItem};

/// Default per-dimension tolerance in grams.
pub const DEFAULT_TOLERANCE_GRAMS: f64 = 5.0;

/// Default maximum number of items in one combination.
pub const DEFAULT_MAX_ITEMS: usize = 5;

/// Default number of distinct combinations requested.
pub const DEFAULT_NUM_COMBINATIONS: usize = 5;

/// Default confidence floor for single-item ranking.
pub const DEFAULT_RANK_MIN_CONFIDENCE: f64 = 0.3;

/// Default truncation limit for single-item ranking.
pub const DEFAULT_RANK_LIMIT: usize = 50;
