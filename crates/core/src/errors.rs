use thiserror::Error;

/// Malformed query input. The only condition surfaced to callers as a true
/// failure; everything else in the engine degrades to an empty result.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("no target dimension specified; at least one of protein/carbs/fat is required")]
    NoTargetDimension,
    #[error("tolerance must be positive, got {0}")]
    NonPositiveTolerance(f64),
    #[error("max_items must be at least 1, got {0}")]
    MaxItemsTooSmall(usize),
    #[error("min_confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Catalog accessor outcomes that are not item lists.
///
/// `NoDataAvailable` is a signal, not a fault: the filtered snapshot was
/// empty and callers must treat it as a valid, empty outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no catalog data available for the requested filters")]
    NoDataAvailable,
    #[error("catalog storage failure: {0}")]
    Storage(String),
}

/// Failures surfaced by the recommendation service.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RecommendError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Catalog(CatalogError),
}
