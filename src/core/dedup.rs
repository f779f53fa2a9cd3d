use crate::models::{FilterCriteria, SortKey, SortKeys};

/// How joined course rows are collapsed back to one row per course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    /// Select the distinct matching course ids first, then re-read the
    /// courses by id. Required when provider joins follow, because the
    /// delivering and accrediting paths produce rows a plain `DISTINCT`
    /// cannot collapse.
    DistinctIds,
    /// `DISTINCT` over the full course row
    DistinctRows,
}

impl DedupStrategy {
    /// The provider-name filter and a provider-name sort each independently
    /// select the id-first path
    pub fn for_request(criteria: &FilterCriteria, sort: &SortKeys) -> Self {
        if criteria.provider_name.is_some() || sort.contains(&SortKey::ProviderName) {
            DedupStrategy::DistinctIds
        } else {
            DedupStrategy::DistinctRows
        }
    }
}
