pub mod catalog;
pub mod target;

pub use catalog::{CatalogItem, ItemId, MacroDimension, MacroTotals};
pub use target::{CatalogFilter, MacroTarget, DEFAULT_FRESHNESS_DAYS};
