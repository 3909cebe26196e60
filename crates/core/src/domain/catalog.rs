use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a catalog item. Matches the integer primary key assigned
/// by the ingestion store; the engine never mints ids of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A snapshot record of one food entry as the ingestion pipeline last saw it.
///
/// Macro fields are `None` when the source menu did not publish a value.
/// Confidence and popularity are owned by external collaborators (the
/// scraper's parse confidence and the selection counter); the engine only
/// ever reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    /// Provenance tag, e.g. which dining location served the item.
    pub venue: String,
    /// Meal-slot tag, e.g. breakfast/lunch/dinner.
    pub meal_slot: String,
    /// Protein in grams, if known.
    pub protein: Option<f64>,
    /// Carbohydrates in grams, if known.
    pub carbs: Option<f64>,
    /// Fat in grams, if known.
    pub fat: Option<f64>,
    /// Energy in kcal, if known. Derived data; never a search target.
    pub calories: Option<f64>,
    /// Trustworthiness of the recorded nutrition values, in [0, 1].
    pub confidence: f64,
    /// How many times users have selected this item. Written only by the
    /// selection collaborator.
    pub popularity: u32,
    /// When the item was last confirmed available.
    pub observed_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Known macro value for one dimension, `None` when unpublished.
    pub fn macro_value(&self, dimension: MacroDimension) -> Option<f64> {
        match dimension {
            MacroDimension::Protein => self.protein,
            MacroDimension::Carbs => self.carbs,
            MacroDimension::Fat => self.fat,
        }
    }

    /// Whole days since this item was last observed, relative to `today`.
    /// Negative when the observation is in the future of `today`.
    pub fn observation_age_days(&self, today: NaiveDate) -> i64 {
        (today - self.observed_at.date_naive()).num_days()
    }
}

/// The three macro dimensions a target may constrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroDimension {
    Protein,
    Carbs,
    Fat,
}

impl MacroDimension {
    pub const ALL: [MacroDimension; 3] =
        [MacroDimension::Protein, MacroDimension::Carbs, MacroDimension::Fat];

    pub fn as_str(self) -> &'static str {
        match self {
            MacroDimension::Protein => "protein",
            MacroDimension::Carbs => "carbs",
            MacroDimension::Fat => "fat",
        }
    }
}

/// Summed macro content of a set of items. Unknown values contribute zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub calories: f64,
}

impl MacroTotals {
    pub fn add(&mut self, item: &CatalogItem) {
        self.protein += item.protein.unwrap_or(0.0);
        self.carbs += item.carbs.unwrap_or(0.0);
        self.fat += item.fat.unwrap_or(0.0);
        self.calories += item.calories.unwrap_or(0.0);
    }

    pub fn get(&self, dimension: MacroDimension) -> f64 {
        match dimension {
            MacroDimension::Protein => self.protein,
            MacroDimension::Carbs => self.carbs,
            MacroDimension::Fat => self.fat,
        }
    }
}
