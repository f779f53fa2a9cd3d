//! Course Search - filter-and-rank search over teacher training courses
//!
//! Request parameters are composed into filter predicates, a deduplication
//! strategy and an ordering. The resulting query runs against PostgreSQL
//! or an in-memory snapshot of the same tables.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{CourseQuery, CourseSearch, SearchError, distance::{haversine_distance, calculate_bounding_box}};
pub use crate::models::{CourseScope, FilterCriteria, Page, RankedCourse, SortKeys};
pub use crate::services::{Dataset, MemoryStore, PostgresClient};
