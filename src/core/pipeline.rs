use crate::core::{
    dedup::DedupStrategy,
    distance::UNIVERSITY_BOOST_KM,
    filters::{CoursePredicate, FilterComposer},
    ordering::SortStrategy,
};
use crate::models::{CourseScope, CriteriaError, FilterCriteria, SortKeys};
use crate::services::StoreError;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by a course search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(#[from] CriteriaError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// An ordered, deduplicated course query that has not been executed yet
///
/// Executors (`PostgresClient`, `MemoryStore`) apply a page window to it,
/// so the filters are composed once and re-used for every page and count.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseQuery {
    pub scope: CourseScope,
    pub predicates: Vec<CoursePredicate>,
    pub dedup: DedupStrategy,
    pub ordering: SortStrategy,
}

/// Query pipeline: compose filters, choose deduplication, choose ordering
///
/// Stateless; one instance can serve any number of concurrent searches.
#[derive(Debug, Clone)]
pub struct CourseSearch {
    composer: FilterComposer,
    university_boost_km: f64,
}

impl CourseSearch {
    pub fn new(composer: FilterComposer, university_boost_km: f64) -> Self {
        Self {
            composer,
            university_boost_km,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FilterComposer::default(), UNIVERSITY_BOOST_KM)
    }

    /// Build the query for one request
    pub fn search(
        &self,
        criteria: &FilterCriteria,
        sort: &SortKeys,
        scope: CourseScope,
    ) -> Result<CourseQuery, SearchError> {
        let predicates = self.composer.compose(criteria);
        let dedup = DedupStrategy::for_request(criteria, sort);
        let ordering = SortStrategy::select(criteria, sort, self.university_boost_km)?;

        tracing::debug!(
            facets = predicates.len(),
            ?dedup,
            ?ordering,
            "Built course search query"
        );

        Ok(CourseQuery {
            scope,
            predicates,
            dedup,
            ordering,
        })
    }

    /// Build the query from raw request parameters; `sort` is read from the same map
    pub fn search_params(
        &self,
        params: &HashMap<String, String>,
        scope: CourseScope,
    ) -> Result<CourseQuery, SearchError> {
        let criteria = FilterCriteria::from_params(params)?;
        let sort = SortKeys::parse(params.get("sort").map(String::as_str).unwrap_or_default());
        self.search(&criteria, &sort, scope)
    }
}

impl Default for CourseSearch {
    fn default() -> Self {
        Self::with_defaults()
    }
}
