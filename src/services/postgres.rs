use crate::config::DatabaseSettings;
use crate::core::{
    dedup::DedupStrategy,
    distance::{calculate_bounding_box, longitude_spans, EARTH_RADIUS_KM},
    filters::CoursePredicate,
    ordering::SortStrategy,
    pipeline::CourseQuery,
};
use crate::models::{
    CourseScope, Location, Origin, Page, ProviderType, PublishState, RankedCourse, SiteState, StudyMode,
    VacancyStatus,
};
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{PgPool, QueryBuilder};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
///
/// Query failures are passed through untouched; nothing is retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

/// Executes course queries against the course database
///
/// The database is owned by the publishing side of the system; this client
/// only ever reads from it.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Create a client whose connections are opened on first use
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Fetch one page of an ordered course query
    pub async fn fetch_page(&self, query: &CourseQuery, page: Page) -> Result<Vec<RankedCourse>, StoreError> {
        let mut builder = render_page(query, page);
        let rows = builder
            .build_query_as::<RankedCourse>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            rows = rows.len(),
            offset = page.offset,
            limit = page.limit,
            "Fetched course page"
        );

        Ok(rows)
    }

    /// Count the courses a query returns across all pages
    pub async fn count(&self, query: &CourseQuery) -> Result<i64, StoreError> {
        let mut builder = render_count(query);
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Render the SQL for one page of `query`
pub fn render_page(query: &CourseQuery, page: Page) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("WITH matched AS (");
    push_matched(&mut builder, query);
    builder.push(
        ") SELECT course.id AS course_id, course.course_code, course.name, \
         provider.provider_code, provider.provider_name, ",
    );
    push_ranking_columns(&mut builder, &query.ordering);
    push_ranked_from(&mut builder, &query.ordering);
    push_order_by(&mut builder, &query.ordering);

    builder
        .push(" LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));
    builder
}

/// Render the SQL counting every row of `query`
pub fn render_count(query: &CourseQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("WITH matched AS (");
    push_matched(&mut builder, query);
    builder.push(") SELECT COUNT(*)");
    push_ranked_from(&mut builder, &query.ordering);
    builder
}

/// Emits ` WHERE ` before the first condition and ` AND ` before the rest
struct Conditions {
    started: bool,
}

impl Conditions {
    fn new() -> Self {
        Self { started: false }
    }

    fn next(&mut self, builder: &mut QueryBuilder<'static, Postgres>) {
        builder.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}

/// Filtered, deduplicated course rows
fn push_matched(builder: &mut QueryBuilder<'static, Postgres>, query: &CourseQuery) {
    match query.dedup {
        DedupStrategy::DistinctRows => {
            builder.push("SELECT DISTINCT course.* FROM course");
            push_filtered(builder, query);
        }
        DedupStrategy::DistinctIds => {
            builder.push("SELECT course.* FROM course WHERE course.id IN (SELECT course.id FROM course");
            push_filtered(builder, query);
            builder.push(")");
        }
    }
}

/// Joins and conditions of the scope and every predicate
fn push_filtered(builder: &mut QueryBuilder<'static, Postgres>, query: &CourseQuery) {
    for predicate in &query.predicates {
        match predicate {
            CoursePredicate::HasVacancies => {
                builder.push(
                    " JOIN site_status AS vacancy_status ON vacancy_status.course_id = course.id",
                );
            }
            CoursePredicate::SubjectCodeIn(_) => {
                builder.push(
                    " JOIN course_subject ON course_subject.course_id = course.id \
                     JOIN subject ON subject.id = course_subject.subject_id",
                );
            }
            CoursePredicate::WithinRadius(_) => {
                builder.push(
                    " JOIN site_status AS located_status ON located_status.course_id = course.id \
                     JOIN site AS located_site ON located_site.id = located_status.site_id",
                );
            }
            _ => {}
        }
    }

    let mut conditions = Conditions::new();
    push_scope(builder, &mut conditions, &query.scope);

    for predicate in &query.predicates {
        conditions.next(builder);
        push_predicate(builder, predicate);
    }
}

fn push_scope(builder: &mut QueryBuilder<'static, Postgres>, conditions: &mut Conditions, scope: &CourseScope) {
    if scope.recruitment_cycle.is_none() && scope.provider_code.is_none() {
        return;
    }

    conditions.next(builder);
    builder.push("course.provider_id IN (SELECT provider.id FROM provider WHERE TRUE");
    if let Some(year) = scope.recruitment_cycle {
        builder.push(" AND provider.recruitment_cycle_year = ").push_bind(year);
    }
    if let Some(code) = &scope.provider_code {
        builder.push(" AND provider.provider_code = ").push_bind(code.clone());
    }
    builder.push(")");
}

fn push_predicate(builder: &mut QueryBuilder<'static, Postgres>, predicate: &CoursePredicate) {
    match predicate {
        CoursePredicate::ProgramTypeIn(types) => {
            let codes: Vec<String> = types.iter().map(|t| t.code().to_string()).collect();
            builder.push("course.program_type = ANY(").push_bind(codes).push(")");
        }
        CoursePredicate::QualificationIn(quals) => {
            let names: Vec<String> = quals.iter().map(|q| q.as_str().to_string()).collect();
            builder.push("course.qualification = ANY(").push_bind(names).push(")");
        }
        CoursePredicate::HasVacancies => {
            push_findable(builder, "vacancy_status");
            builder.push(" AND (");
            let mut modes = builder.separated(" OR ");
            for mode in [StudyMode::FullTime, StudyMode::PartTime, StudyMode::FullTimeOrPartTime] {
                let covering: Vec<String> = VacancyStatus::covering(mode)
                    .into_iter()
                    .map(|status| status.code().to_string())
                    .collect();
                modes
                    .push("(course.study_mode = ")
                    .push_bind_unseparated(mode.code())
                    .push_unseparated(" AND vacancy_status.vac_status = ANY(")
                    .push_bind_unseparated(covering)
                    .push_unseparated("))");
            }
            builder.push(")");
        }
        CoursePredicate::StudyModeIn(modes) => {
            let codes: Vec<String> = modes.iter().map(|m| m.code().to_string()).collect();
            builder.push("course.study_mode = ANY(").push_bind(codes).push(")");
        }
        CoursePredicate::SubjectCodeIn(codes) => {
            let codes: Vec<String> = codes.iter().cloned().collect();
            builder.push("subject.subject_code = ANY(").push_bind(codes).push(")");
        }
        CoursePredicate::ProviderName(name) => {
            builder
                .push("(course.provider_id IN (SELECT provider.id FROM provider WHERE provider.provider_name = ")
                .push_bind(name.clone())
                .push(") OR course.accredited_body_code IN (SELECT provider.provider_code FROM provider WHERE provider.provider_name = ")
                .push_bind(name.clone())
                .push("))");
        }
        CoursePredicate::Send => {
            builder.push("course.is_send");
        }
        CoursePredicate::WithinRadius(location) => push_within_radius(builder, location),
    }
}

/// Running and published
fn push_findable(builder: &mut QueryBuilder<'static, Postgres>, status: &str) {
    builder
        .push(format!("{status}.status = "))
        .push_bind(SiteState::Running.code())
        .push(format!(" AND {status}.publish = "))
        .push_bind(PublishState::Published.code());
}

/// Findable, geocoded and with an address line or postcode
fn push_eligible_site(builder: &mut QueryBuilder<'static, Postgres>, status: &str, site: &str) {
    push_findable(builder, status);
    builder.push(format!(
        " AND {site}.latitude IS NOT NULL AND {site}.longitude IS NOT NULL \
         AND (COALESCE({site}.address1, '') <> '' OR COALESCE({site}.postcode, '') <> '')"
    ));
}

fn push_within_radius(builder: &mut QueryBuilder<'static, Postgres>, location: &Location) {
    let bbox = calculate_bounding_box(location.origin.latitude, location.origin.longitude, location.radius_km);

    builder.push("(");
    push_eligible_site(builder, "located_status", "located_site");
    builder
        .push(" AND located_site.latitude BETWEEN ")
        .push_bind(bbox.min_lat)
        .push(" AND ")
        .push_bind(bbox.max_lat)
        .push(" AND (");
    let mut spans = builder.separated(" OR ");
    for (min_lon, max_lon) in longitude_spans(&bbox) {
        spans
            .push("located_site.longitude BETWEEN ")
            .push_bind_unseparated(min_lon)
            .push_unseparated(" AND ")
            .push_bind_unseparated(max_lon);
    }
    builder.push(") AND ");
    push_haversine(builder, &location.origin, "located_site");
    builder.push(" < ").push_bind(location.radius_km).push(")");
}

/// Great-circle distance in kilometers from `origin` to a site row
fn push_haversine(builder: &mut QueryBuilder<'static, Postgres>, origin: &Origin, site: &str) {
    builder
        .push(format!("(2 * {EARTH_RADIUS_KM} * ASIN(LEAST(1.0, SQRT(POWER(SIN(RADIANS({site}.latitude - "))
        .push_bind(origin.latitude)
        .push(") / 2), 2) + COS(RADIANS(")
        .push_bind(origin.latitude)
        .push(format!(")) * COS(RADIANS({site}.latitude)) * POWER(SIN(RADIANS({site}.longitude - "))
        .push_bind(origin.longitude)
        .push(") / 2), 2)))))");
}

fn push_ranking_columns(builder: &mut QueryBuilder<'static, Postgres>, ordering: &SortStrategy) {
    match ordering {
        SortStrategy::Distance {
            university_boost_km: Some(bonus),
            ..
        } => {
            builder
                .push("distances.distance, CASE WHEN provider.provider_type = ")
                .push_bind(ProviderType::University.code())
                .push(" THEN distances.distance - ")
                .push_bind(*bonus)
                .push(" ELSE distances.distance END AS boosted_distance");
        }
        SortStrategy::Distance { .. } => {
            builder.push("distances.distance, NULL::float8 AS boosted_distance");
        }
        _ => {
            builder.push("NULL::float8 AS distance, NULL::float8 AS boosted_distance");
        }
    }
}

/// Matched courses joined to their provider and, for distance ordering, to
/// the closest eligible site of each course
fn push_ranked_from(builder: &mut QueryBuilder<'static, Postgres>, ordering: &SortStrategy) {
    builder.push(" FROM matched AS course JOIN provider ON provider.id = course.provider_id");

    if let SortStrategy::Distance { origin, .. } = ordering {
        builder.push(" JOIN (SELECT eligible_status.course_id, MIN");
        push_haversine(builder, origin, "eligible_site");
        builder.push(
            " AS distance FROM site_status AS eligible_status \
             JOIN site AS eligible_site ON eligible_site.id = eligible_status.site_id WHERE ",
        );
        push_eligible_site(builder, "eligible_status", "eligible_site");
        builder.push(
            " GROUP BY eligible_status.course_id) AS distances ON distances.course_id = course.id",
        );
    }
}

/// Provider names compare case-insensitively, then byte-wise, matching `canonical_order`
const CANONICAL_ASC: &str = "LOWER(provider.provider_name) COLLATE \"C\" ASC, provider.provider_name COLLATE \"C\" ASC, \
     course.course_code COLLATE \"C\" ASC, course.id ASC";
const CANONICAL_DESC: &str = "LOWER(provider.provider_name) COLLATE \"C\" DESC, provider.provider_name COLLATE \"C\" DESC, \
     course.course_code COLLATE \"C\" DESC, course.id ASC";

fn push_order_by(builder: &mut QueryBuilder<'static, Postgres>, ordering: &SortStrategy) {
    builder.push(" ORDER BY ");
    match ordering {
        SortStrategy::DeliveringFirst { provider_name } => {
            builder
                .push("(provider.provider_name = ")
                .push_bind(provider_name.clone())
                .push(") DESC, ")
                .push(CANONICAL_ASC);
        }
        SortStrategy::CanonicalAscending => {
            builder.push(CANONICAL_ASC);
        }
        SortStrategy::CanonicalDescending => {
            builder.push(CANONICAL_DESC);
        }
        SortStrategy::Distance {
            university_boost_km: Some(_),
            ..
        } => {
            builder.push("boosted_distance ASC, ").push(CANONICAL_ASC);
        }
        SortStrategy::Distance { .. } => {
            builder.push("distances.distance ASC, ").push(CANONICAL_ASC);
        }
        SortStrategy::Natural => {
            builder.push("course.id ASC");
        }
    }
}
