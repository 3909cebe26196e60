use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CatalogItem, MacroDimension, MacroTarget};

use super::types::{RankRequest, RankedItem};

/// Weights for the single-item relevance score. The defaults put roughly
/// 40% of the attainable mass on confidence, 40% on macro fit, and the rest
/// on popularity and freshness.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Points awarded at confidence 1.0; scales linearly below.
    pub confidence: f64,
    /// Points per recorded selection.
    pub popularity_per_selection: f64,
    /// Cap on the popularity contribution.
    pub popularity_cap: f64,
    /// Maximum fit credit for an exact protein match.
    pub protein_fit: f64,
    /// Maximum fit credit for an exact carbs match.
    pub carbs_fit: f64,
    /// Maximum fit credit for an exact fat match.
    pub fat_fit: f64,
    /// Observations this many days old or older earn no freshness bonus.
    pub freshness_horizon_days: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            confidence: 40.0,
            popularity_per_selection: 0.5,
            popularity_cap: 20.0,
            protein_fit: 15.0,
            carbs_fit: 15.0,
            fat_fit: 10.0,
            freshness_horizon_days: 7,
        }
    }
}

impl ScoringWeights {
    fn fit_weight(&self, dimension: MacroDimension) -> f64 {
        match dimension {
            MacroDimension::Protein => self.protein_fit,
            MacroDimension::Carbs => self.carbs_fit,
            MacroDimension::Fat => self.fat_fit,
        }
    }
}

/// Scores individual catalog items against a macro target.
#[derive(Clone, Debug, Default)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
}

impl RelevanceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Additive relevance score for one item.
    ///
    /// Confidence and popularity always contribute. Each constrained
    /// dimension with a known value within `tolerance` of its goal earns
    /// linear partial credit; dimensions outside the band or with no
    /// published value earn nothing. Observations within the freshness
    /// horizon of `today` earn one point per remaining day.
    pub fn score(
        &self,
        item: &CatalogItem,
        target: &MacroTarget,
        tolerance: f64,
        today: NaiveDate,
    ) -> f64 {
        let weights = &self.weights;
        let mut score = item.confidence * weights.confidence;
        score += (f64::from(item.popularity) * weights.popularity_per_selection)
            .min(weights.popularity_cap);

        for (dimension, goal) in target.specified() {
            let Some(value) = item.macro_value(dimension) else { continue };
            let diff = (value - goal).abs();
            if diff <= tolerance {
                score += (tolerance - diff) / tolerance * weights.fit_weight(dimension);
            }
        }

        let age = item.observation_age_days(today).max(0);
        if age <= weights.freshness_horizon_days {
            score += (weights.freshness_horizon_days - age) as f64;
        }

        score
    }

    /// Ranks a snapshot against the request: filters by confidence, scores,
    /// sorts by score descending (item id ascending on ties), truncates.
    pub fn rank(
        &self,
        snapshot: &[CatalogItem],
        request: &RankRequest,
        today: NaiveDate,
    ) -> Vec<RankedItem> {
        let mut ranked: Vec<RankedItem> = snapshot
            .iter()
            .filter(|item| item.confidence >= request.min_confidence)
            .map(|item| RankedItem {
                item: item.clone(),
                score: self.score(item, &request.target, request.tolerance, today),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        ranked.truncate(request.limit);
        ranked
    }
}
