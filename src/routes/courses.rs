use actix_web::{web, HttpResponse, Responder};
use crate::config::SearchSettings;
use crate::core::{CourseSearch, SearchError};
use crate::models::{CourseScope, CourseSearchResponse, ErrorResponse, HealthResponse, PageParams, SearchMeta};
use crate::services::PostgresClient;
use std::collections::HashMap;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub search: CourseSearch,
    pub settings: SearchSettings,
}

impl AppState {
    /// Scope every search starts from: the configured cycle, if any
    fn base_scope(&self) -> CourseScope {
        match self.settings.recruitment_cycle {
            Some(year) => CourseScope::all().in_cycle(year),
            None => CourseScope::all(),
        }
    }
}

/// Configure all course-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/courses", web::get().to(search_courses))
        .route("/providers/{provider_code}/courses", web::get().to(search_provider_courses));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Search courses
///
/// GET /api/v1/courses?subjects=C1,F1&latitude=53.4&longitude=-2.9&radius=10&sort=distance
async fn search_courses(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let scope = state.base_scope();
    run_search(&state, &query, scope).await
}

/// Search the courses of one provider
///
/// GET /api/v1/providers/{provider_code}/courses
async fn search_provider_courses(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let scope = state.base_scope().for_provider(path.into_inner());
    run_search(&state, &query, scope).await
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

async fn run_search(state: &AppState, params: &HashMap<String, String>, scope: CourseScope) -> HttpResponse {
    let page_params = match PageParams::from_query(params, state.settings.default_per_page) {
        Ok(page_params) => page_params,
        Err(e) => {
            tracing::info!("Rejected pagination: {}", e);
            return bad_request("Invalid pagination", e.to_string());
        }
    };

    let query = match state.search.search_params(params, scope) {
        Ok(query) => query,
        Err(e) => {
            tracing::info!("Rejected course search: {}", e);
            return bad_request("Invalid search criteria", e.to_string());
        }
    };

    let page = page_params.window(state.settings.max_per_page);
    let result = tokio::try_join!(
        state.postgres.fetch_page(&query, page),
        state.postgres.count(&query),
    )
    .map_err(SearchError::from);

    match result {
        Ok((courses, count)) => {
            tracing::info!(
                "Returning {} courses (page {}, {} in total)",
                courses.len(),
                page_params.page,
                count
            );

            HttpResponse::Ok().json(CourseSearchResponse {
                data: courses,
                meta: SearchMeta {
                    count,
                    page: page_params.page,
                    per_page: page.limit,
                },
            })
        }
        Err(e) => {
            tracing::error!("Failed to run course search: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to search courses".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
