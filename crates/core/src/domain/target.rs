use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::catalog::MacroDimension;

/// Default trailing observation window, in days.
pub const DEFAULT_FRESHNESS_DAYS: u32 = 7;

/// Caller-supplied macro goals. Any subset of the three dimensions may be
/// specified; energy is derived from picks and never targeted directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTarget {
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl MacroTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protein(mut self, grams: f64) -> Self {
        self.protein = Some(grams);
        self
    }

    pub fn with_carbs(mut self, grams: f64) -> Self {
        self.carbs = Some(grams);
        self
    }

    pub fn with_fat(mut self, grams: f64) -> Self {
        self.fat = Some(grams);
        self
    }

    pub fn get(&self, dimension: MacroDimension) -> Option<f64> {
        match dimension {
            MacroDimension::Protein => self.protein,
            MacroDimension::Carbs => self.carbs,
            MacroDimension::Fat => self.fat,
        }
    }

    /// Dimensions the caller actually constrained, with their goal values.
    pub fn specified(&self) -> Vec<(MacroDimension, f64)> {
        MacroDimension::ALL
            .iter()
            .filter_map(|dimension| self.get(*dimension).map(|goal| (*dimension, goal)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.protein.is_none() && self.carbs.is_none() && self.fat.is_none()
    }

    /// Canonical fragment for cache keys. Stable across construction order.
    pub fn signature(&self) -> String {
        fn part(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |goal| format!("{goal:.1}"))
        }
        format!("p={},c={},f={}", part(self.protein), part(self.carbs), part(self.fat))
    }
}

/// Filter predicate for a catalog snapshot read.
///
/// `target_date` anchors both the observation window (items observed within
/// `[target_date - freshness_days, target_date + 1 day]`) and the freshness
/// bonus in relevance scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub venue: Option<String>,
    pub meal_slot: Option<String>,
    pub target_date: NaiveDate,
    pub freshness_days: u32,
    pub min_confidence: f64,
}

impl CatalogFilter {
    pub fn for_date(target_date: NaiveDate) -> Self {
        Self {
            venue: None,
            meal_slot: None,
            target_date,
            freshness_days: DEFAULT_FRESHNESS_DAYS,
            min_confidence: 0.0,
        }
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn with_meal_slot(mut self, meal_slot: impl Into<String>) -> Self {
        self.meal_slot = Some(meal_slot.into());
        self
    }

    pub fn with_freshness_days(mut self, days: u32) -> Self {
        self.freshness_days = days;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Canonical cache key for snapshot reads with this filter.
    pub fn signature(&self) -> String {
        format!(
            "catalog:{}:{}:{}:{}:{:.2}",
            self.venue.as_deref().unwrap_or("*"),
            self.meal_slot.as_deref().unwrap_or("*"),
            self.target_date,
            self.freshness_days,
            self.min_confidence,
        )
    }
}
