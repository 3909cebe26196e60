use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use macromatch_core::{CatalogError, CatalogFilter, CatalogItem, CatalogSource, ItemId};
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use crate::DbPool;

use super::RepositoryError;

/// Confidence assigned to entries whose source gave no parse signal.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// SQLite-backed catalog store.
///
/// Reads serve the recommendation engine through [`CatalogSource`]; writes
/// come from the ingestion side (`upsert_item`) and the selection counter
/// (`record_selection`).
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts a scraped entry, or refreshes the existing row for the same
    /// (name, venue, meal_slot). Popularity is owned by the selection
    /// counter and survives re-scrapes untouched.
    pub async fn upsert_item(&self, item: &NewCatalogItem) -> Result<ItemId, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO catalog_item (
                name, venue, meal_slot, protein, carbs, fat, calories, confidence, observed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (name, venue, meal_slot) DO UPDATE SET
                protein = excluded.protein,
                carbs = excluded.carbs,
                fat = excluded.fat,
                calories = excluded.calories,
                confidence = excluded.confidence,
                observed_at = excluded.observed_at
            RETURNING id
            "#,
        )
        .bind(&item.name)
        .bind(&item.venue)
        .bind(&item.meal_slot)
        .bind(item.protein)
        .bind(item.carbs)
        .bind(item.fat)
        .bind(item.calories)
        .bind(item.confidence)
        .bind(item.observed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(ItemId(id))
    }

    /// Bumps the selection counter for one item, returning the new count.
    pub async fn record_selection(&self, id: ItemId) -> Result<u32, RepositoryError> {
        let popularity: Option<i64> = sqlx::query_scalar(
            "UPDATE catalog_item SET popularity = popularity + 1 WHERE id = ? RETURNING popularity",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        let popularity = popularity.ok_or(RepositoryError::ItemNotFound(id.0))?;
        Ok(u32::try_from(popularity).unwrap_or(u32::MAX))
    }

    fn item_from_row(row: &SqliteRow) -> Result<CatalogItem, CatalogError> {
        let id: i64 = row.try_get("id").map_err(db_error)?;
        let popularity_raw: i64 = row.try_get("popularity").map_err(db_error)?;
        let popularity = u32::try_from(popularity_raw).map_err(|_| {
            CatalogError::Storage(format!(
                "popularity `{popularity_raw}` on catalog item {id} does not fit in u32"
            ))
        })?;
        let observed_at: DateTime<Utc> = row.try_get("observed_at").map_err(db_error)?;

        Ok(CatalogItem {
            id: ItemId(id),
            name: row.try_get("name").map_err(db_error)?,
            venue: row.try_get("venue").map_err(db_error)?,
            meal_slot: row.try_get("meal_slot").map_err(db_error)?,
            protein: row.try_get("protein").map_err(db_error)?,
            carbs: row.try_get("carbs").map_err(db_error)?,
            fat: row.try_get("fat").map_err(db_error)?,
            calories: row.try_get("calories").map_err(db_error)?,
            confidence: row.try_get("confidence").map_err(db_error)?,
            popularity,
            observed_at,
        })
    }
}

#[async_trait]
impl CatalogSource for SqlCatalogRepository {
    async fn fetch(&self, filter: &CatalogFilter) -> Result<Vec<CatalogItem>, CatalogError> {
        let window_start = day_start(window_floor(filter.target_date, filter.freshness_days));
        let window_end = day_start(window_ceil(filter.target_date));

        let rows = sqlx::query(
            r#"
            SELECT id, name, venue, meal_slot, protein, carbs, fat, calories,
                   confidence, popularity, observed_at
            FROM catalog_item
            WHERE (? IS NULL OR venue = ?)
              AND (? IS NULL OR meal_slot = ?)
              AND observed_at >= ?
              AND observed_at < ?
              AND confidence >= ?
            ORDER BY confidence DESC, popularity DESC, id ASC
            "#,
        )
        .bind(&filter.venue)
        .bind(&filter.venue)
        .bind(&filter.meal_slot)
        .bind(&filter.meal_slot)
        .bind(window_start)
        .bind(window_end)
        .bind(filter.min_confidence)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        if rows.is_empty() {
            return Err(CatalogError::NoDataAvailable);
        }

        debug!(
            event_name = "catalog_snapshot_loaded",
            items = rows.len(),
            venue = filter.venue.as_deref().unwrap_or("*"),
            meal_slot = filter.meal_slot.as_deref().unwrap_or("*"),
            "catalog snapshot loaded"
        );
        rows.iter().map(Self::item_from_row).collect()
    }
}

/// One scraped entry, ready for upsert. Identity is (name, venue, meal_slot).
#[derive(Clone, Debug)]
pub struct NewCatalogItem {
    pub name: String,
    pub venue: String,
    pub meal_slot: String,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub calories: Option<f64>,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

impl NewCatalogItem {
    pub fn new(
        name: impl Into<String>,
        venue: impl Into<String>,
        meal_slot: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            venue: venue.into(),
            meal_slot: meal_slot.into(),
            protein: None,
            carbs: None,
            fat: None,
            calories: None,
            confidence: DEFAULT_CONFIDENCE,
            observed_at,
        }
    }

    pub fn with_macros(
        mut self,
        protein: Option<f64>,
        carbs: Option<f64>,
        fat: Option<f64>,
        calories: Option<f64>,
    ) -> Self {
        self.protein = protein;
        self.carbs = carbs;
        self.fat = fat;
        self.calories = calories;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

fn window_floor(target_date: NaiveDate, freshness_days: u32) -> NaiveDate {
    target_date.checked_sub_days(Days::new(u64::from(freshness_days))).unwrap_or(NaiveDate::MIN)
}

fn window_ceil(target_date: NaiveDate) -> NaiveDate {
    target_date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn db_error(error: sqlx::Error) -> CatalogError {
    CatalogError::Storage(format!("database error: {error}"))
}
