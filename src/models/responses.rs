use serde::{Deserialize, Serialize};
use crate::models::domain::RankedCourse;

/// Response for the course search endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSearchResponse {
    pub data: Vec<RankedCourse>,
    pub meta: SearchMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMeta {
    pub count: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
