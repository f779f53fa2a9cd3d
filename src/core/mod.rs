// Core algorithm exports
pub mod dedup;
pub mod distance;
pub mod filters;
pub mod ordering;
pub mod pipeline;

pub use dedup::DedupStrategy;
pub use distance::{
    boosted_distance, calculate_bounding_box, closest_site_distance, haversine_distance,
    is_eligible_site, is_within_bounding_box, longitude_spans, UNIVERSITY_BOOST_KM,
};
pub use filters::{CoursePredicate, FilterComposer, FundingTypeTable};
pub use ordering::{RankKey, SortStrategy};
pub use pipeline::{CourseQuery, CourseSearch, SearchError};
