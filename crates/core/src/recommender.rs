//! Recommendation service: wires the catalog port, the scorer, and the
//! combination search together behind TTL caches.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::config::EngineConfig;
use crate::domain::{CatalogFilter, CatalogItem};
use crate::errors::{CatalogError, RecommendError};
use crate::matching::{
    Combination, CombinationRequest, CombinationSearch, RankRequest, RankedItem, RelevanceScorer,
};

/// Read-side port over the catalog store.
///
/// `fetch` returns the snapshot matching the filter, or
/// [`CatalogError::NoDataAvailable`] when nothing matches. The service maps
/// that signal to empty results; only storage faults propagate as errors.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, filter: &CatalogFilter) -> Result<Vec<CatalogItem>, CatalogError>;
}

pub struct Recommender {
    catalog: Arc<dyn CatalogSource>,
    scorer: RelevanceScorer,
    search: CombinationSearch,
    snapshots: TtlCache<Vec<CatalogItem>>,
    rankings: TtlCache<Vec<RankedItem>>,
    combinations: TtlCache<Vec<Combination>>,
}

impl Recommender {
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        Self::with_config(catalog, &EngineConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn CatalogSource>, config: &EngineConfig) -> Self {
        let ttl = config.cache.ttl();
        Self {
            catalog,
            scorer: RelevanceScorer::with_weights(config.scoring),
            search: CombinationSearch::with_config(config.search),
            snapshots: TtlCache::new(ttl),
            rankings: TtlCache::new(ttl),
            combinations: TtlCache::new(ttl),
        }
    }

    /// Ranks individual catalog items against the request's target.
    ///
    /// An empty snapshot yields an empty ranking. Results are cached under
    /// the canonical filter and request signatures.
    pub async fn rank_items(
        &self,
        filter: &CatalogFilter,
        request: &RankRequest,
    ) -> Result<Vec<RankedItem>, RecommendError> {
        request.validate()?;
        let key = format!("{}|{}", filter.signature(), request.signature());
        if let Some(hit) = self.rankings.get(&key) {
            debug!(event_name = "ranking_cache_hit", key = %key, "ranking cache hit");
            return Ok(hit);
        }

        let snapshot = self.snapshot(filter).await?;
        let ranked = self.scorer.rank(&snapshot, request, filter.target_date);
        info!(
            event_name = "items_ranked",
            candidates = snapshot.len(),
            ranked = ranked.len(),
            "items ranked"
        );
        self.rankings.insert(key, ranked.clone());
        Ok(ranked)
    }

    /// Searches for item combinations near the request's target.
    ///
    /// Results are cached under the canonical signatures; fewer combinations
    /// than requested (including none) is a valid cached outcome.
    pub async fn find_combinations(
        &self,
        filter: &CatalogFilter,
        request: &CombinationRequest,
    ) -> Result<Vec<Combination>, RecommendError> {
        request.validate()?;
        let key = format!("{}|{}", filter.signature(), request.signature());
        if let Some(hit) = self.combinations.get(&key) {
            debug!(event_name = "combination_cache_hit", key = %key, "combination cache hit");
            return Ok(hit);
        }

        let snapshot = self.snapshot(filter).await?;
        let found = self.search.find_combinations(&snapshot, request)?;
        info!(
            event_name = "combinations_found",
            candidates = snapshot.len(),
            requested = request.num_combinations,
            found = found.len(),
            "combination search finished"
        );
        self.combinations.insert(key, found.clone());
        Ok(found)
    }

    /// Combination search with a caller-supplied generator, for reproducible
    /// runs. Bypasses the result cache; the snapshot cache still applies.
    pub async fn find_combinations_with_rng<R: Rng + Send>(
        &self,
        filter: &CatalogFilter,
        request: &CombinationRequest,
        rng: &mut R,
    ) -> Result<Vec<Combination>, RecommendError> {
        let snapshot = self.snapshot(filter).await?;
        Ok(self.search.find_combinations_with_rng(&snapshot, request, rng)?)
    }

    /// Drops all cached snapshots and results. Call after the catalog store
    /// changes underneath the engine.
    pub fn clear_cache(&self) {
        self.snapshots.clear();
        self.rankings.clear();
        self.combinations.clear();
        debug!(event_name = "caches_cleared", "recommendation caches cleared");
    }

    async fn snapshot(&self, filter: &CatalogFilter) -> Result<Vec<CatalogItem>, RecommendError> {
        let key = filter.signature();
        if let Some(hit) = self.snapshots.get(&key) {
            return Ok(hit);
        }

        let items = match self.catalog.fetch(filter).await {
            Ok(items) => items,
            Err(CatalogError::NoDataAvailable) => {
                debug!(event_name = "catalog_empty", key = %key, "no catalog data for filter");
                Vec::new()
            }
            Err(err) => return Err(RecommendError::Catalog(err)),
        };
        self.snapshots.insert(key, items.clone());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{NaiveDate, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::domain::{ItemId, MacroTarget};
    use crate::errors::QueryError;

    use super::*;

    struct FakeCatalog {
        items: Vec<CatalogItem>,
        fetches: AtomicUsize,
        fail_with: Option<CatalogError>,
    }

    impl FakeCatalog {
        fn with_items(items: Vec<CatalogItem>) -> Self {
            Self { items, fetches: AtomicUsize::new(0), fail_with: None }
        }

        fn failing(error: CatalogError) -> Self {
            Self { items: Vec::new(), fetches: AtomicUsize::new(0), fail_with: Some(error) }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn fetch(&self, _filter: &CatalogFilter) -> Result<Vec<CatalogItem>, CatalogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            Ok(self.items.clone())
        }
    }

    fn item(id: i64, protein: f64, carbs: f64) -> CatalogItem {
        CatalogItem {
            id: ItemId(id),
            name: format!("item-{id}"),
            venue: "north".to_string(),
            meal_slot: "lunch".to_string(),
            protein: Some(protein),
            carbs: Some(carbs),
            fat: Some(5.0),
            calories: Some(4.0 * (protein + carbs) + 45.0),
            confidence: 0.9,
            popularity: 2,
            observed_at: Utc.with_ymd_and_hms(2026, 8, 22, 12, 0, 0).unwrap(),
        }
    }

    fn filter() -> CatalogFilter {
        CatalogFilter::for_date(NaiveDate::from_ymd_opt(2026, 8, 23).unwrap())
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_catalog_once() {
        let catalog = Arc::new(FakeCatalog::with_items(vec![item(1, 40.0, 30.0)]));
        let recommender = Recommender::new(catalog.clone());
        let request = RankRequest::new(MacroTarget::new().with_protein(40.0));

        let first = recommender.rank_items(&filter(), &request).await.unwrap();
        let second = recommender.rank_items(&filter(), &request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(catalog.fetch_count(), 1);
    }

    #[tokio::test]
    async fn clear_cache_forces_a_fresh_fetch() {
        let catalog = Arc::new(FakeCatalog::with_items(vec![item(1, 40.0, 30.0)]));
        let recommender = Recommender::new(catalog.clone());
        let request = RankRequest::new(MacroTarget::new().with_protein(40.0));

        recommender.rank_items(&filter(), &request).await.unwrap();
        recommender.clear_cache();
        recommender.rank_items(&filter(), &request).await.unwrap();

        assert_eq!(catalog.fetch_count(), 2);
    }

    #[tokio::test]
    async fn no_data_available_becomes_an_empty_result() {
        let catalog = Arc::new(FakeCatalog::failing(CatalogError::NoDataAvailable));
        let recommender = Recommender::new(catalog);
        let target = MacroTarget::new().with_protein(40.0);

        let ranked = recommender.rank_items(&filter(), &RankRequest::new(target)).await.unwrap();
        assert!(ranked.is_empty());

        let found = recommender
            .find_combinations(&filter(), &CombinationRequest::new(target))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn storage_faults_propagate() {
        let catalog =
            Arc::new(FakeCatalog::failing(CatalogError::Storage("disk on fire".to_string())));
        let recommender = Recommender::new(catalog);
        let request = RankRequest::new(MacroTarget::new().with_protein(40.0));

        let result = recommender.rank_items(&filter(), &request).await;
        assert!(matches!(result, Err(RecommendError::Catalog(CatalogError::Storage(_)))));
    }

    #[tokio::test]
    async fn invalid_request_fails_before_touching_the_catalog() {
        let catalog = Arc::new(FakeCatalog::with_items(vec![item(1, 40.0, 30.0)]));
        let recommender = Recommender::new(catalog.clone());
        let request = CombinationRequest::new(MacroTarget::new());

        let result = recommender.find_combinations(&filter(), &request).await;
        assert!(matches!(result, Err(RecommendError::Query(QueryError::NoTargetDimension))));
        assert_eq!(catalog.fetch_count(), 0);
    }

    #[tokio::test]
    async fn seeded_search_reuses_the_cached_snapshot() {
        let catalog = Arc::new(FakeCatalog::with_items(vec![
            item(1, 25.0, 30.0),
            item(2, 15.0, 20.0),
        ]));
        let recommender = Recommender::new(catalog.clone());
        let target = MacroTarget::new().with_protein(40.0).with_carbs(50.0);
        let request = CombinationRequest::new(target).with_num_combinations(1);

        let mut first_rng = StdRng::seed_from_u64(9);
        let first = recommender
            .find_combinations_with_rng(&filter(), &request, &mut first_rng)
            .await
            .unwrap();
        let mut second_rng = StdRng::seed_from_u64(9);
        let second = recommender
            .find_combinations_with_rng(&filter(), &request, &mut second_rng)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].score, 100.0);
        assert_eq!(catalog.fetch_count(), 1);
    }

    #[tokio::test]
    async fn different_targets_use_different_cache_entries() {
        let catalog = Arc::new(FakeCatalog::with_items(vec![item(1, 40.0, 30.0)]));
        let recommender = Recommender::new(catalog.clone());

        let a = RankRequest::new(MacroTarget::new().with_protein(40.0));
        let b = RankRequest::new(MacroTarget::new().with_protein(41.0));
        let ranked_a = recommender.rank_items(&filter(), &a).await.unwrap();
        let ranked_b = recommender.rank_items(&filter(), &b).await.unwrap();

        // Same snapshot serves both rankings, but the scores differ.
        assert_eq!(catalog.fetch_count(), 1);
        assert!(ranked_a[0].score > ranked_b[0].score);
    }
}
