use serde::{Deserialize, Serialize};

use crate::domain::{CatalogItem, ItemId, MacroDimension, MacroTarget, MacroTotals};
use crate::errors::QueryError;

use super::{
    DEFAULT_MAX_ITEMS, DEFAULT_NUM_COMBINATIONS, DEFAULT_RANK_LIMIT, DEFAULT_RANK_MIN_CONFIDENCE,
    DEFAULT_TOLERANCE_GRAMS,
};

/// Parameters for single-item relevance ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankRequest {
    pub target: MacroTarget,
    /// Per-dimension band, in grams, inside which partial fit credit accrues.
    pub tolerance: f64,
    /// Items below this confidence are excluded from the ranking.
    pub min_confidence: f64,
    /// Maximum number of ranked items returned.
    pub limit: usize,
}

impl RankRequest {
    pub fn new(target: MacroTarget) -> Self {
        Self {
            target,
            tolerance: DEFAULT_TOLERANCE_GRAMS,
            min_confidence: DEFAULT_RANK_MIN_CONFIDENCE,
            limit: DEFAULT_RANK_LIMIT,
        }
    }

    pub fn with_tolerance(mut self, grams: f64) -> Self {
        self.tolerance = grams;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.tolerance <= 0.0 {
            return Err(QueryError::NonPositiveTolerance(self.tolerance));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(QueryError::ConfidenceOutOfRange(self.min_confidence));
        }
        Ok(())
    }

    /// Canonical cache-key fragment. Equivalent requests built in different
    /// field orders produce identical signatures.
    pub fn signature(&self) -> String {
        format!(
            "rank:{}:{:.1}:{:.2}:{}",
            self.target.signature(),
            self.tolerance,
            self.min_confidence,
            self.limit,
        )
    }
}

/// Parameters for the combination search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinationRequest {
    pub target: MacroTarget,
    /// Per-dimension acceptance band, in grams.
    pub tolerance: f64,
    /// Hard cap on items per combination.
    pub max_items: usize,
    /// Number of distinct combinations requested. Zero yields no attempts.
    pub num_combinations: usize,
}

impl CombinationRequest {
    pub fn new(target: MacroTarget) -> Self {
        Self {
            target,
            tolerance: DEFAULT_TOLERANCE_GRAMS,
            max_items: DEFAULT_MAX_ITEMS,
            num_combinations: DEFAULT_NUM_COMBINATIONS,
        }
    }

    pub fn with_tolerance(mut self, grams: f64) -> Self {
        self.tolerance = grams;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_num_combinations(mut self, num_combinations: usize) -> Self {
        self.num_combinations = num_combinations;
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.target.is_empty() {
            return Err(QueryError::NoTargetDimension);
        }
        if self.tolerance <= 0.0 {
            return Err(QueryError::NonPositiveTolerance(self.tolerance));
        }
        if self.max_items < 1 {
            return Err(QueryError::MaxItemsTooSmall(self.max_items));
        }
        Ok(())
    }

    pub fn signature(&self) -> String {
        format!(
            "combo:{}:{:.1}:{}:{}",
            self.target.signature(),
            self.tolerance,
            self.max_items,
            self.num_combinations,
        )
    }
}

/// One catalog item paired with its relevance score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item: CatalogItem,
    pub score: f64,
}

/// Absolute deviation from the target, per constrained dimension. Unconstrained
/// dimensions stay `None` and never count toward fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroDeviation {
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl MacroDeviation {
    pub fn from_totals(totals: &MacroTotals, specified: &[(MacroDimension, f64)]) -> Self {
        let mut deviation = Self::default();
        for (dimension, goal) in specified {
            let diff = (totals.get(*dimension) - goal).abs();
            match dimension {
                MacroDimension::Protein => deviation.protein = Some(diff),
                MacroDimension::Carbs => deviation.carbs = Some(diff),
                MacroDimension::Fat => deviation.fat = Some(diff),
            }
        }
        deviation
    }

    pub fn get(&self, dimension: MacroDimension) -> Option<f64> {
        match dimension {
            MacroDimension::Protein => self.protein,
            MacroDimension::Carbs => self.carbs,
            MacroDimension::Fat => self.fat,
        }
    }

    /// Summed absolute deviation over the constrained dimensions.
    pub fn total(&self) -> f64 {
        self.protein.unwrap_or(0.0) + self.carbs.unwrap_or(0.0) + self.fat.unwrap_or(0.0)
    }
}

/// One accepted combination. Items keep their selection order; identity for
/// deduplication and tie-breaking is the sorted id set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    pub item_ids: Vec<ItemId>,
    pub item_names: Vec<String>,
    pub totals: MacroTotals,
    pub deviation: MacroDeviation,
    /// Fit score in [0, 100]; 100 means every constrained total hit its goal.
    pub score: f64,
}

impl Combination {
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    /// Sorted item ids, the canonical identity of this combination.
    pub fn id_set(&self) -> Vec<ItemId> {
        let mut ids = self.item_ids.clone();
        ids.sort_unstable();
        ids
    }
}
