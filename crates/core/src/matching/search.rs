use std::cmp::Ordering;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CatalogItem, ItemId, MacroDimension, MacroTotals};
use crate::errors::QueryError;

use super::types::{Combination, CombinationRequest, MacroDeviation};

/// Tuning knobs for the combination search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Items with at least this much protein go to the protein-dense pool.
    pub protein_pool_min_grams: f64,
    /// Non-protein-dense items with at least this many carbs go to the
    /// carb-dense pool.
    pub carb_pool_min_grams: f64,
    /// Attempt budget per requested combination.
    pub attempt_multiplier: usize,
    /// Candidates considered per pool within one attempt.
    pub pool_scan_limit: usize,
    /// A finished pick is accepted when every constrained total lands
    /// within `acceptance_band * tolerance` of its goal.
    pub acceptance_band: f64,
    /// An item is skipped when adding it would push any constrained total
    /// beyond its goal by more than `overshoot_band * tolerance`.
    pub overshoot_band: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            protein_pool_min_grams: 15.0,
            carb_pool_min_grams: 25.0,
            attempt_multiplier: 3,
            pool_scan_limit: 10,
            acceptance_band: 1.5,
            overshoot_band: 2.0,
        }
    }
}

/// Randomized greedy search for item combinations that land near a target.
///
/// Each attempt walks the macro pools in a shuffled order and greedily adds
/// items that do not overshoot, stopping early once every constrained total
/// is within tolerance. Attempts whose final totals fall outside the
/// acceptance band are discarded, so an unreachable target yields an empty
/// result rather than a bad one.
#[derive(Clone, Debug, Default)]
pub struct CombinationSearch {
    config: SearchConfig,
}

impl CombinationSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Runs the search with a freshly seeded generator.
    pub fn find_combinations(
        &self,
        snapshot: &[CatalogItem],
        request: &CombinationRequest,
    ) -> Result<Vec<Combination>, QueryError> {
        let mut rng = StdRng::from_entropy();
        self.find_combinations_with_rng(snapshot, request, &mut rng)
    }

    /// Runs the search with a caller-supplied generator. The same snapshot,
    /// request, and generator state produce the same combinations.
    pub fn find_combinations_with_rng<R: Rng>(
        &self,
        snapshot: &[CatalogItem],
        request: &CombinationRequest,
        rng: &mut R,
    ) -> Result<Vec<Combination>, QueryError> {
        request.validate()?;
        if snapshot.is_empty() || request.num_combinations == 0 {
            return Ok(Vec::new());
        }

        let specified = request.target.specified();
        let pools = self.build_pools(snapshot);
        let budget = request.num_combinations * self.config.attempt_multiplier;

        let mut accepted: Vec<Combination> = Vec::new();
        let mut seen: HashSet<Vec<ItemId>> = HashSet::new();

        for _ in 0..budget {
            if accepted.len() >= request.num_combinations {
                break;
            }
            let Some(combination) = self.attempt(&pools, request, &specified, rng) else {
                continue;
            };
            if seen.insert(combination.id_set()) {
                accepted.push(combination);
            }
        }

        accepted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    a.deviation
                        .total()
                        .partial_cmp(&b.deviation.total())
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.id_set().cmp(&b.id_set()))
        });

        debug!(
            event_name = "combination_search_completed",
            requested = request.num_combinations,
            accepted = accepted.len(),
            attempt_budget = budget,
            "combination search completed"
        );
        Ok(accepted)
    }

    /// Splits the snapshot into protein-dense, carb-dense, and balanced
    /// pools. Protein density wins when an item qualifies for both.
    fn build_pools<'a>(&self, snapshot: &'a [CatalogItem]) -> [Vec<&'a CatalogItem>; 3] {
        let mut protein_dense = Vec::new();
        let mut carb_dense = Vec::new();
        let mut balanced = Vec::new();

        for item in snapshot {
            if item.protein.unwrap_or(0.0) >= self.config.protein_pool_min_grams {
                protein_dense.push(item);
            } else if item.carbs.unwrap_or(0.0) >= self.config.carb_pool_min_grams {
                carb_dense.push(item);
            } else {
                balanced.push(item);
            }
        }

        [protein_dense, carb_dense, balanced]
    }

    fn attempt<R: Rng>(
        &self,
        pools: &[Vec<&CatalogItem>; 3],
        request: &CombinationRequest,
        specified: &[(MacroDimension, f64)],
        rng: &mut R,
    ) -> Option<Combination> {
        let mut order: Vec<usize> = (0..pools.len()).collect();
        order.shuffle(rng);

        let mut selected: Vec<&CatalogItem> = Vec::new();
        let mut selected_ids: HashSet<ItemId> = HashSet::new();
        let mut totals = MacroTotals::default();

        'pools: for &pool_index in &order {
            let mut candidates = pools[pool_index].clone();
            candidates.shuffle(rng);

            for item in candidates.into_iter().take(self.config.pool_scan_limit) {
                if selected.len() >= request.max_items {
                    break 'pools;
                }
                if selected_ids.contains(&item.id) {
                    continue;
                }
                if self.would_overshoot(&totals, item, specified, request.tolerance) {
                    continue;
                }

                totals.add(item);
                selected_ids.insert(item.id);
                selected.push(item);

                if within_band(&totals, specified, request.tolerance) {
                    break 'pools;
                }
            }
        }

        if selected.is_empty() {
            return None;
        }
        if !within_band_scaled(&totals, specified, request.tolerance, self.config.acceptance_band) {
            return None;
        }

        let deviation = MacroDeviation::from_totals(&totals, specified);
        let mean_deviation = deviation.total() / specified.len() as f64;
        Some(Combination {
            item_ids: selected.iter().map(|item| item.id).collect(),
            item_names: selected.iter().map(|item| item.name.clone()).collect(),
            totals,
            deviation,
            score: (100.0 - mean_deviation).max(0.0),
        })
    }

    fn would_overshoot(
        &self,
        totals: &MacroTotals,
        item: &CatalogItem,
        specified: &[(MacroDimension, f64)],
        tolerance: f64,
    ) -> bool {
        specified.iter().any(|(dimension, goal)| {
            let projected = totals.get(*dimension) + item.macro_value(*dimension).unwrap_or(0.0);
            projected > goal + self.config.overshoot_band * tolerance
        })
    }
}

fn within_band(totals: &MacroTotals, specified: &[(MacroDimension, f64)], tolerance: f64) -> bool {
    within_band_scaled(totals, specified, tolerance, 1.0)
}

fn within_band_scaled(
    totals: &MacroTotals,
    specified: &[(MacroDimension, f64)],
    tolerance: f64,
    factor: f64,
) -> bool {
    specified
        .iter()
        .all(|(dimension, goal)| (totals.get(*dimension) - goal).abs() <= factor * tolerance)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::domain::MacroTarget;

    use super::*;

    fn item(id: i64, name: &str, protein: f64, carbs: f64, fat: f64) -> CatalogItem {
        CatalogItem {
            id: ItemId(id),
            name: name.to_string(),
            venue: "north".to_string(),
            meal_slot: "lunch".to_string(),
            protein: Some(protein),
            carbs: Some(carbs),
            fat: Some(fat),
            calories: Some(4.0 * (protein + carbs) + 9.0 * fat),
            confidence: 0.9,
            popularity: 0,
            observed_at: Utc.with_ymd_and_hms(2026, 8, 22, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn two_item_snapshot_with_exact_fit_scores_one_hundred() {
        let snapshot = vec![
            item(1, "Grilled Chicken", 25.0, 30.0, 5.0),
            item(2, "Rice Bowl", 15.0, 20.0, 3.0),
        ];
        let target = MacroTarget::new().with_protein(40.0).with_carbs(50.0);
        let request = CombinationRequest::new(target).with_num_combinations(1);

        let mut rng = StdRng::seed_from_u64(11);
        let search = CombinationSearch::new();
        let found = search.find_combinations_with_rng(&snapshot, &request, &mut rng).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id_set(), vec![ItemId(1), ItemId(2)]);
        assert_eq!(found[0].score, 100.0);
        assert_eq!(found[0].totals.protein, 40.0);
        assert_eq!(found[0].totals.carbs, 50.0);
        assert_eq!(found[0].deviation.total(), 0.0);
    }

    #[test]
    fn unreachable_target_yields_empty_not_error() {
        let snapshot = vec![item(1, "Side Salad", 3.0, 5.0, 1.0)];
        let target = MacroTarget::new().with_protein(200.0);
        let request = CombinationRequest::new(target);

        let mut rng = StdRng::seed_from_u64(3);
        let search = CombinationSearch::new();
        let found = search.find_combinations_with_rng(&snapshot, &request, &mut rng).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn zero_requested_combinations_short_circuits() {
        let snapshot = vec![item(1, "Grilled Chicken", 25.0, 30.0, 5.0)];
        let target = MacroTarget::new().with_protein(25.0);
        let request = CombinationRequest::new(target).with_num_combinations(0);

        let mut rng = StdRng::seed_from_u64(3);
        let search = CombinationSearch::new();
        let found = search.find_combinations_with_rng(&snapshot, &request, &mut rng).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn invalid_request_is_rejected_before_searching() {
        let snapshot = vec![item(1, "Grilled Chicken", 25.0, 30.0, 5.0)];
        let request = CombinationRequest::new(MacroTarget::new());

        let mut rng = StdRng::seed_from_u64(3);
        let search = CombinationSearch::new();
        let result = search.find_combinations_with_rng(&snapshot, &request, &mut rng);
        assert_eq!(result, Err(QueryError::NoTargetDimension));
    }

    #[test]
    fn results_never_repeat_an_item_within_a_combination() {
        let snapshot = vec![
            item(1, "Chicken", 20.0, 0.0, 2.0),
            item(2, "Turkey", 20.0, 0.0, 2.0),
            item(3, "Tofu", 20.0, 0.0, 4.0),
        ];
        let target = MacroTarget::new().with_protein(40.0);
        let request = CombinationRequest::new(target).with_num_combinations(5);

        let mut rng = StdRng::seed_from_u64(17);
        let search = CombinationSearch::new();
        let found = search.find_combinations_with_rng(&snapshot, &request, &mut rng).unwrap();

        assert!(!found.is_empty());
        for combination in &found {
            let unique: HashSet<ItemId> = combination.item_ids.iter().copied().collect();
            assert_eq!(unique.len(), combination.item_ids.len());
        }
    }

    #[test]
    fn duplicate_id_sets_are_collapsed_regardless_of_pick_order() {
        // Only one viable pair exists, so every successful attempt finds it,
        // possibly in either order. Exactly one combination must survive.
        let snapshot = vec![
            item(1, "Chicken", 25.0, 30.0, 5.0),
            item(2, "Rice", 15.0, 20.0, 3.0),
        ];
        let target = MacroTarget::new().with_protein(40.0).with_carbs(50.0);
        let request = CombinationRequest::new(target).with_num_combinations(5);

        let mut rng = StdRng::seed_from_u64(29);
        let search = CombinationSearch::new();
        let found = search.find_combinations_with_rng(&snapshot, &request, &mut rng).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn same_seed_reproduces_the_same_results() {
        let snapshot: Vec<CatalogItem> = (1..=12)
            .map(|id| {
                item(
                    id,
                    &format!("item-{id}"),
                    5.0 + (id as f64) * 3.0,
                    10.0 + (id as f64) * 4.0,
                    2.0 + id as f64,
                )
            })
            .collect();
        let target = MacroTarget::new().with_protein(45.0).with_carbs(80.0);
        let request = CombinationRequest::new(target).with_tolerance(10.0);

        let search = CombinationSearch::new();
        let mut first_rng = StdRng::seed_from_u64(42);
        let mut second_rng = StdRng::seed_from_u64(42);
        let first = search.find_combinations_with_rng(&snapshot, &request, &mut first_rng).unwrap();
        let second =
            search.find_combinations_with_rng(&snapshot, &request, &mut second_rng).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn results_are_ordered_by_score_then_deviation() {
        let snapshot: Vec<CatalogItem> = (1..=15)
            .map(|id| {
                item(
                    id,
                    &format!("item-{id}"),
                    10.0 + (id as f64) * 2.5,
                    15.0 + (id as f64) * 3.0,
                    3.0,
                )
            })
            .collect();
        let target = MacroTarget::new().with_protein(50.0).with_carbs(70.0);
        let request =
            CombinationRequest::new(target).with_tolerance(12.0).with_num_combinations(8);

        let mut rng = StdRng::seed_from_u64(7);
        let search = CombinationSearch::new();
        let found = search.find_combinations_with_rng(&snapshot, &request, &mut rng).unwrap();

        for pair in found.windows(2) {
            assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                assert!(pair[0].deviation.total() <= pair[1].deviation.total());
            }
        }
    }

    #[test]
    fn max_items_caps_combination_size() {
        let snapshot: Vec<CatalogItem> =
            (1..=10).map(|id| item(id, &format!("item-{id}"), 8.0, 10.0, 2.0)).collect();
        let target = MacroTarget::new().with_protein(16.0);
        let request = CombinationRequest::new(target).with_max_items(2).with_tolerance(4.0);

        let mut rng = StdRng::seed_from_u64(5);
        let search = CombinationSearch::new();
        let found = search.find_combinations_with_rng(&snapshot, &request, &mut rng).unwrap();

        assert!(!found.is_empty());
        for combination in &found {
            assert!(combination.len() <= 2);
        }
    }

    #[test]
    fn pool_split_prefers_protein_density() {
        let snapshot = vec![
            item(1, "Steak", 30.0, 30.0, 10.0),
            item(2, "Pasta", 8.0, 40.0, 5.0),
            item(3, "Salad", 3.0, 8.0, 2.0),
        ];
        let search = CombinationSearch::new();
        let pools = search.build_pools(&snapshot);

        assert_eq!(pools[0].iter().map(|i| i.id).collect::<Vec<_>>(), vec![ItemId(1)]);
        assert_eq!(pools[1].iter().map(|i| i.id).collect::<Vec<_>>(), vec![ItemId(2)]);
        assert_eq!(pools[2].iter().map(|i| i.id).collect::<Vec<_>>(), vec![ItemId(3)]);
    }
}
