use crate::models::{CriteriaError, FilterCriteria, Origin, SortKey, SortKeys};
use std::cmp::Ordering;

/// The single ordering applied to a search, chosen by `SortStrategy::select`
#[derive(Debug, Clone, PartialEq)]
pub enum SortStrategy {
    /// Courses the named provider delivers, then those it only accredits;
    /// canonical ascending inside each group
    DeliveringFirst { provider_name: String },
    /// Provider name, then course code, ascending
    CanonicalAscending,
    CanonicalDescending,
    /// Closest eligible site first. Courses without one are excluded.
    Distance {
        origin: Origin,
        university_boost_km: Option<f64>,
    },
    /// No explicit ordering requested
    Natural,
}

impl SortStrategy {
    /// Select the ordering for a request, first match wins:
    ///
    /// 1. provider-name filter present
    /// 2. sort is exactly `{name, provider.provider_name}`
    /// 3. sort is exactly `{-name, -provider.provider_name}`
    /// 4. sort is exactly `{distance}`
    /// 5. anything else
    pub fn select(
        criteria: &FilterCriteria,
        sort: &SortKeys,
        university_boost_km: f64,
    ) -> Result<Self, CriteriaError> {
        if let Some(provider_name) = &criteria.provider_name {
            return Ok(SortStrategy::DeliveringFirst {
                provider_name: provider_name.clone(),
            });
        }

        if sort.is_exactly(&[SortKey::Name, SortKey::ProviderName]) {
            return Ok(SortStrategy::CanonicalAscending);
        }

        if sort.is_exactly(&[SortKey::NameDescending, SortKey::ProviderNameDescending]) {
            return Ok(SortStrategy::CanonicalDescending);
        }

        if sort.is_exactly(&[SortKey::Distance]) {
            let origin = criteria.origin.ok_or(CriteriaError::MissingOrigin)?;
            return Ok(SortStrategy::Distance {
                origin,
                university_boost_km: criteria.expand_university.then_some(university_boost_km),
            });
        }

        if !sort.is_empty() {
            tracing::debug!(?sort, "Sort keys select no ordering, keeping natural order");
        }
        Ok(SortStrategy::Natural)
    }
}

/// Ranking attributes of one candidate course, as seen by the comparators
#[derive(Debug, Clone, Copy)]
pub struct RankKey<'a> {
    pub course_id: i64,
    pub course_code: &'a str,
    pub provider_name: &'a str,
    pub distance: Option<f64>,
    pub boosted_distance: Option<f64>,
}

/// Case-insensitive first, byte-wise among names that differ only in case
#[inline]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Provider name, course code, then id so no two courses compare equal
#[inline]
pub fn canonical_order(a: &RankKey<'_>, b: &RankKey<'_>) -> Ordering {
    compare_names(a.provider_name, b.provider_name)
        .then_with(|| a.course_code.cmp(b.course_code))
        .then_with(|| a.course_id.cmp(&b.course_id))
}

/// Full comparator for `strategy`; `Natural` keeps the incoming order
pub fn compare(strategy: &SortStrategy, a: &RankKey<'_>, b: &RankKey<'_>) -> Ordering {
    match strategy {
        SortStrategy::DeliveringFirst { provider_name } => {
            let delivered = |key: &RankKey<'_>| key.provider_name == provider_name.as_str();
            delivered(b)
                .cmp(&delivered(a))
                .then_with(|| canonical_order(a, b))
        }
        SortStrategy::CanonicalAscending => canonical_order(a, b),
        SortStrategy::CanonicalDescending => compare_names(b.provider_name, a.provider_name)
            .then_with(|| b.course_code.cmp(a.course_code))
            .then_with(|| a.course_id.cmp(&b.course_id)),
        SortStrategy::Distance {
            university_boost_km,
            ..
        } => {
            let rank = |key: &RankKey<'_>| {
                if university_boost_km.is_some() {
                    key.boosted_distance
                } else {
                    key.distance
                }
            };
            let (ra, rb) = (rank(a), rank(b));
            match (ra, rb) {
                (Some(ra), Some(rb)) => ra.total_cmp(&rb),
                _ => ra.is_none().cmp(&rb.is_none()),
            }
            .then_with(|| canonical_order(a, b))
        }
        SortStrategy::Natural => Ordering::Equal,
    }
}
