//! Deterministic catalog seed for integration tests and local demos.

use chrono::{Duration, NaiveDate, NaiveTime};
use macromatch_core::ItemId;

use crate::repositories::{NewCatalogItem, RepositoryError, SqlCatalogRepository};
use crate::DbPool;

struct SeedItem {
    name: &'static str,
    venue: &'static str,
    meal_slot: &'static str,
    protein: f64,
    carbs: f64,
    fat: f64,
    confidence: f64,
    selections: u32,
    age_days: i64,
}

/// A small menu spread across two venues: protein-dense mains, carb-dense
/// sides, and low-macro extras, so every search pool is populated.
const SEED_ITEMS: &[SeedItem] = &[
    SeedItem { name: "Grilled Chicken Breast", venue: "north", meal_slot: "lunch", protein: 35.0, carbs: 0.0, fat: 4.0, confidence: 0.95, selections: 12, age_days: 0 },
    SeedItem { name: "Baked Salmon", venue: "north", meal_slot: "lunch", protein: 28.0, carbs: 0.0, fat: 13.0, confidence: 0.9, selections: 7, age_days: 1 },
    SeedItem { name: "Tofu Stir Fry", venue: "north", meal_slot: "lunch", protein: 18.0, carbs: 14.0, fat: 9.0, confidence: 0.8, selections: 4, age_days: 0 },
    SeedItem { name: "Steamed Rice", venue: "north", meal_slot: "lunch", protein: 4.0, carbs: 45.0, fat: 0.5, confidence: 0.9, selections: 20, age_days: 0 },
    SeedItem { name: "Penne Marinara", venue: "north", meal_slot: "lunch", protein: 9.0, carbs: 52.0, fat: 6.0, confidence: 0.85, selections: 9, age_days: 1 },
    SeedItem { name: "Roasted Potatoes", venue: "north", meal_slot: "lunch", protein: 3.0, carbs: 30.0, fat: 7.0, confidence: 0.85, selections: 6, age_days: 2 },
    SeedItem { name: "Garden Salad", venue: "north", meal_slot: "lunch", protein: 2.0, carbs: 6.0, fat: 3.0, confidence: 0.7, selections: 3, age_days: 0 },
    SeedItem { name: "Steamed Broccoli", venue: "north", meal_slot: "lunch", protein: 3.0, carbs: 7.0, fat: 0.5, confidence: 0.8, selections: 2, age_days: 1 },
    SeedItem { name: "Turkey Burger", venue: "south", meal_slot: "lunch", protein: 26.0, carbs: 28.0, fat: 11.0, confidence: 0.9, selections: 10, age_days: 0 },
    SeedItem { name: "Black Bean Bowl", venue: "south", meal_slot: "lunch", protein: 16.0, carbs: 40.0, fat: 5.0, confidence: 0.75, selections: 5, age_days: 1 },
    SeedItem { name: "Scrambled Eggs", venue: "north", meal_slot: "breakfast", protein: 13.0, carbs: 2.0, fat: 10.0, confidence: 0.9, selections: 15, age_days: 0 },
    SeedItem { name: "Oatmeal", venue: "north", meal_slot: "breakfast", protein: 6.0, carbs: 32.0, fat: 3.0, confidence: 0.85, selections: 8, age_days: 0 },
];

/// Seeds the catalog relative to `reference_date` so freshness windows in
/// tests behave the same on any day. Returns the inserted ids in seed order.
pub async fn seed_catalog(
    pool: &DbPool,
    reference_date: NaiveDate,
) -> Result<Vec<ItemId>, RepositoryError> {
    let repo = SqlCatalogRepository::new(pool.clone());
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut ids = Vec::with_capacity(SEED_ITEMS.len());

    for seed in SEED_ITEMS {
        let observed_at =
            (reference_date.and_time(noon) - Duration::days(seed.age_days)).and_utc();
        let calories = 4.0 * (seed.protein + seed.carbs) + 9.0 * seed.fat;
        let item = NewCatalogItem::new(seed.name, seed.venue, seed.meal_slot, observed_at)
            .with_macros(Some(seed.protein), Some(seed.carbs), Some(seed.fat), Some(calories))
            .with_confidence(seed.confidence);

        let id = repo.upsert_item(&item).await?;
        for _ in 0..seed.selections {
            repo.record_selection(id).await?;
        }
        ids.push(id);
    }

    Ok(ids)
}
