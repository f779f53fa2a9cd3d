// Integration tests for Course Search

use course_search::core::distance::haversine_distance;
use course_search::core::CourseSearch;
use course_search::models::{
    Course, CourseScope, CourseSubject, Level, Origin, Page, ProgramType, Provider, ProviderType, PublishState,
    Qualification, RankedCourse, Site, SiteState, SiteStatus, StudyMode, Subject, SubjectType, VacancyStatus,
};
use course_search::services::{render_count, render_page, Dataset, MemoryStore};
use std::collections::HashMap;

// Liverpool city centre
const ORIGIN_LAT: f64 = 53.4084;
const ORIGIN_LNG: f64 = -2.9916;

#[derive(Default)]
struct Fixture {
    data: Dataset,
}

impl Fixture {
    fn provider(mut self, id: i64, code: &str, name: &str, provider_type: ProviderType) -> Self {
        self.data.providers.push(Provider {
            id,
            provider_code: code.to_string(),
            provider_name: name.to_string(),
            provider_type,
            recruitment_cycle_year: 2024,
            latitude: None,
            longitude: None,
        });
        self
    }

    fn course(mut self, id: i64, provider_id: i64, code: &str, edit: impl FnOnce(&mut Course)) -> Self {
        let mut course = Course {
            id,
            provider_id,
            course_code: code.to_string(),
            name: format!("Course {}", code),
            qualification: Qualification::PgceWithQts,
            program_type: ProgramType::HigherEducationProgramme,
            study_mode: StudyMode::FullTime,
            level: Level::Secondary,
            is_send: false,
            accredited_body_code: None,
        };
        edit(&mut course);
        self.data.courses.push(course);
        self
    }

    /// Adds a geocoded, addressed site and a running, published status linking it to `course_id`
    fn site(self, course_id: i64, site_id: i64, lat: f64, lng: f64) -> Self {
        self.site_with(course_id, site_id, lat, lng, |_, _| {})
    }

    fn site_with(
        mut self,
        course_id: i64,
        site_id: i64,
        lat: f64,
        lng: f64,
        edit: impl FnOnce(&mut Site, &mut SiteStatus),
    ) -> Self {
        let mut site = Site {
            id: site_id,
            provider_id: 1,
            code: site_id.to_string(),
            location_name: format!("Site {}", site_id),
            address1: Some("1 Hope Street".to_string()),
            postcode: Some("L1 9BP".to_string()),
            latitude: Some(lat),
            longitude: Some(lng),
        };
        let mut status = SiteStatus {
            id: site_id * 100 + course_id,
            course_id,
            site_id,
            status: SiteState::Running,
            publish: PublishState::Published,
            vac_status: VacancyStatus::BothFullTimeAndPartTimeVacancies,
        };
        edit(&mut site, &mut status);
        self.data.sites.push(site);
        self.data.site_statuses.push(status);
        self
    }

    fn subject(mut self, course_id: i64, subject_id: i64, code: &str) -> Self {
        if !self.data.subjects.iter().any(|s| s.id == subject_id) {
            self.data.subjects.push(Subject {
                id: subject_id,
                subject_code: code.to_string(),
                subject_name: code.to_string(),
                subject_type: SubjectType::Secondary,
            });
        }
        self.data.course_subjects.push(CourseSubject { course_id, subject_id });
        self
    }

    fn store(self) -> MemoryStore {
        MemoryStore::new(self.data)
    }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn run(store: &MemoryStore, pairs: &[(&str, &str)]) -> Vec<RankedCourse> {
    let query = CourseSearch::with_defaults()
        .search_params(&params(pairs), CourseScope::all())
        .unwrap();
    store.fetch_all(&query)
}

fn codes(courses: &[RankedCourse]) -> Vec<&str> {
    courses.iter().map(|c| c.course_code.as_str()).collect()
}

fn liverpool_dataset() -> MemoryStore {
    Fixture::default()
        .provider(1, "SCH", "Mersey School", ProviderType::School)
        .provider(2, "UNI", "Liverpool University", ProviderType::University)
        .provider(3, "LEA", "Wirral Lead School", ProviderType::LeadSchool)
        .course(1, 1, "CLOSE", |_| {})
        .course(2, 2, "MIDDLE", |_| {})
        .course(3, 3, "FAR", |_| {})
        .site(1, 1, 53.4100, -2.9800)
        .site(2, 2, 53.4500, -2.9500)
        .site(3, 3, 53.5000, -2.9000)
        .store()
}

#[test]
fn test_integration_canonical_ascending_ignores_course_name() {
    let store = Fixture::default()
        .provider(1, "PB", "ProviderB", ProviderType::School)
        .provider(2, "PA", "ProviderA", ProviderType::School)
        .course(1, 1, "X123", |c| c.name = "Art".to_string())
        .course(2, 2, "Y999", |c| c.name = "Zoology".to_string())
        .store();

    let asc = run(&store, &[("sort", "name,provider.provider_name")]);
    assert_eq!(codes(&asc), vec!["Y999", "X123"]);

    let desc = run(&store, &[("sort", "-name,-provider.provider_name")]);
    assert_eq!(codes(&desc), vec!["X123", "Y999"]);
}

#[test]
fn test_integration_canonical_order_ignores_provider_case() {
    let store = Fixture::default()
        .provider(1, "BRV", "Bravo Teaching", ProviderType::School)
        .provider(2, "ACM", "acme training", ProviderType::Scitt)
        .course(1, 1, "B1", |_| {})
        .course(2, 2, "A1", |_| {})
        .store();

    let asc = run(&store, &[("sort", "name,provider.provider_name")]);
    assert_eq!(codes(&asc), vec!["A1", "B1"]);

    let desc = run(&store, &[("sort", "-name,-provider.provider_name")]);
    assert_eq!(codes(&desc), vec!["B1", "A1"]);
}

#[test]
fn test_integration_provider_name_delivered_first() {
    let store = Fixture::default()
        .provider(1, "ACM", "Acme", ProviderType::Scitt)
        .provider(2, "AAR", "Aardvark College", ProviderType::School)
        .course(1, 2, "A", |c| c.accredited_body_code = Some("ACM".to_string()))
        .course(2, 1, "D", |_| {})
        .course(3, 2, "UNRELATED", |_| {})
        .store();

    let results = run(&store, &[("provider.provider_name", "Acme")]);
    assert_eq!(codes(&results), vec!["D", "A"]);

    // Sort tokens do not override the provider-name ordering
    let sorted = run(
        &store,
        &[("provider.provider_name", "Acme"), ("sort", "name,provider.provider_name")],
    );
    assert_eq!(codes(&sorted), vec!["D", "A"]);
}

#[test]
fn test_integration_university_boost() {
    let store = liverpool_dataset();
    let origin = [("latitude", "53.4084"), ("longitude", "-2.9916"), ("sort", "distance")];

    let plain = run(&store, &origin);
    assert_eq!(codes(&plain), vec!["CLOSE", "MIDDLE", "FAR"]);
    assert!(plain.iter().all(|c| c.boosted_distance.is_none()));

    let mut boosted_params = origin.to_vec();
    boosted_params.push(("expand_university", "true"));
    let boosted = run(&store, &boosted_params);
    assert_eq!(codes(&boosted), vec!["MIDDLE", "CLOSE", "FAR"]);

    let university = &boosted[0];
    let raw = university.distance.unwrap();
    assert!((university.boosted_distance.unwrap() - (raw - 10.0)).abs() < 1e-9);
    assert!(university.boosted_distance.unwrap() < 0.0);

    // Non-university courses keep their raw distance
    let close = &boosted[1];
    assert_eq!(close.boosted_distance, close.distance);
}

#[test]
fn test_integration_distance_uses_closest_eligible_site() {
    let store = Fixture::default()
        .provider(1, "SCH", "Mersey School", ProviderType::School)
        .course(1, 1, "MULTI", |_| {})
        .site(1, 1, 53.5000, -2.9000)
        .site(1, 2, 53.4100, -2.9800)
        // Closer than both, but suspended
        .site_with(1, 3, ORIGIN_LAT, ORIGIN_LNG, |_, status| status.status = SiteState::Suspended)
        .store();

    let results = run(&store, &[("latitude", "53.4084"), ("longitude", "-2.9916"), ("sort", "distance")]);
    assert_eq!(results.len(), 1);

    let origin = Origin { latitude: ORIGIN_LAT, longitude: ORIGIN_LNG };
    let expected = haversine_distance(origin.point(), geo::Point::new(-2.9800, 53.4100));
    assert!((results[0].distance.unwrap() - expected).abs() < 1e-9);
}

#[test]
fn test_integration_ineligible_sites_never_match() {
    let store = Fixture::default()
        .provider(1, "SCH", "Mersey School", ProviderType::School)
        .course(1, 1, "SUSPENDED", |_| {})
        .course(2, 1, "UNPUBLISHED", |_| {})
        .course(3, 1, "NO_ADDRESS", |_| {})
        .course(4, 1, "NOT_GEOCODED", |_| {})
        .course(5, 1, "OK", |_| {})
        .site_with(1, 1, ORIGIN_LAT, ORIGIN_LNG, |_, status| status.status = SiteState::Suspended)
        .site_with(2, 2, ORIGIN_LAT, ORIGIN_LNG, |_, status| status.publish = PublishState::Unpublished)
        .site_with(3, 3, ORIGIN_LAT, ORIGIN_LNG, |site, _| {
            site.address1 = Some(String::new());
            site.postcode = None;
        })
        .site_with(4, 4, ORIGIN_LAT, ORIGIN_LNG, |site, _| site.latitude = None)
        .site(5, 5, ORIGIN_LAT, ORIGIN_LNG)
        .store();

    let within = run(&store, &[("latitude", "53.4084"), ("longitude", "-2.9916"), ("radius", "5")]);
    assert_eq!(codes(&within), vec!["OK"]);

    let sorted = run(&store, &[("latitude", "53.4084"), ("longitude", "-2.9916"), ("sort", "distance")]);
    assert_eq!(codes(&sorted), vec!["OK"]);

    // Without a location facet every course is returned
    assert_eq!(run(&store, &[]).len(), 5);
}

#[test]
fn test_integration_radius_is_strict() {
    let store = liverpool_dataset();
    let origin = Origin { latitude: ORIGIN_LAT, longitude: ORIGIN_LNG };
    let middle = haversine_distance(origin.point(), geo::Point::new(-2.9500, 53.4500));

    let exact = middle.to_string();
    let at_edge = run(&store, &[("latitude", "53.4084"), ("longitude", "-2.9916"), ("radius", exact.as_str())]);
    assert_eq!(codes(&at_edge), vec!["CLOSE"]);

    let wider = (middle + 0.001).to_string();
    let inside = run(&store, &[("latitude", "53.4084"), ("longitude", "-2.9916"), ("radius", wider.as_str())]);
    assert_eq!(codes(&inside), vec!["CLOSE", "MIDDLE"]);
}

#[test]
fn test_integration_radius_search_crosses_antimeridian() {
    let store = Fixture::default()
        .provider(1, "PAC", "Pacific School", ProviderType::School)
        .course(1, 1, "EAST_OF_LINE", |_| {})
        .course(2, 1, "FAR_EAST", |_| {})
        .site(1, 1, 0.0, -179.95)
        .site(2, 2, 0.0, -170.0)
        .store();

    let near_line = run(&store, &[("latitude", "0"), ("longitude", "179.95"), ("radius", "50")]);
    assert_eq!(codes(&near_line), vec!["EAST_OF_LINE"]);

    let whole_globe = run(&store, &[("latitude", "0"), ("longitude", "100"), ("radius", "20000")]);
    assert_eq!(codes(&whole_globe), vec!["EAST_OF_LINE", "FAR_EAST"]);
}

#[test]
fn test_integration_location_needs_all_three_params() {
    let store = liverpool_dataset();
    assert_eq!(run(&store, &[("latitude", "53.4084"), ("radius", "1")]).len(), 3);
    assert_eq!(run(&store, &[("latitude", "53.4084"), ("longitude", "-2.9916")]).len(), 3);
    assert_eq!(
        run(&store, &[("latitude", "53.4084"), ("longitude", "-2.9916"), ("radius", "1")]).len(),
        1
    );
}

#[test]
fn test_integration_funding_type_apprenticeship() {
    let store = Fixture::default()
        .provider(1, "SCH", "Mersey School", ProviderType::School)
        .course(1, 1, "APPRENTICE", |c| c.program_type = ProgramType::PgTeachingApprenticeship)
        .course(2, 1, "SALARIED", |c| c.program_type = ProgramType::SchoolDirectSalariedTrainingProgramme)
        .course(3, 1, "FEE", |c| c.program_type = ProgramType::HigherEducationProgramme)
        .store();

    let apprenticeship = run(&store, &[("funding_type", "apprenticeship")]);
    assert_eq!(codes(&apprenticeship), vec!["APPRENTICE"]);

    let salary = run(&store, &[("funding", "salary")]);
    assert_eq!(codes(&salary), vec!["APPRENTICE", "SALARIED"]);

    let fee_or_salary = run(&store, &[("funding_type", "fee,salary")]);
    assert_eq!(codes(&fee_or_salary), vec!["SALARIED", "FEE"]);
}

#[test]
fn test_integration_full_time_includes_either_mode() {
    let store = Fixture::default()
        .provider(1, "SCH", "Mersey School", ProviderType::School)
        .course(1, 1, "FT", |c| c.study_mode = StudyMode::FullTime)
        .course(2, 1, "PT", |c| c.study_mode = StudyMode::PartTime)
        .course(3, 1, "EITHER", |c| c.study_mode = StudyMode::FullTimeOrPartTime)
        .store();

    assert_eq!(codes(&run(&store, &[("study_type", "full_time")])), vec!["FT", "EITHER"]);
    assert_eq!(codes(&run(&store, &[("study_type", "part_time")])), vec!["PT", "EITHER"]);
}

#[test]
fn test_integration_vacancies_follow_study_mode() {
    let store = Fixture::default()
        .provider(1, "SCH", "Mersey School", ProviderType::School)
        .course(1, 1, "FT_WITH_PT_VACANCY", |c| c.study_mode = StudyMode::FullTime)
        .course(2, 1, "FT_WITH_FT_VACANCY", |c| c.study_mode = StudyMode::FullTime)
        .course(3, 1, "FULL", |_| {})
        .site_with(1, 1, ORIGIN_LAT, ORIGIN_LNG, |_, s| s.vac_status = VacancyStatus::PartTimeVacancies)
        .site_with(2, 2, ORIGIN_LAT, ORIGIN_LNG, |_, s| s.vac_status = VacancyStatus::FullTimeVacancies)
        .site_with(3, 3, ORIGIN_LAT, ORIGIN_LNG, |_, s| s.vac_status = VacancyStatus::NoVacancies)
        .store();

    assert_eq!(codes(&run(&store, &[("has_vacancies", "true")])), vec!["FT_WITH_FT_VACANCY"]);
    assert_eq!(run(&store, &[("has_vacancies", "yes")]).len(), 3);
}

#[test]
fn test_integration_multi_join_course_appears_once() {
    let store = Fixture::default()
        .provider(1, "ACM", "Acme", ProviderType::School)
        .course(1, 1, "MATHS_PHYSICS_CS", |_| {})
        .course(2, 1, "HISTORY", |_| {})
        .subject(1, 1, "G1")
        .subject(1, 2, "F3")
        .subject(1, 3, "11")
        .subject(2, 4, "V1")
        .site(1, 1, 53.4100, -2.9800)
        .site(1, 2, 53.4090, -2.9900)
        .site(2, 3, 53.4100, -2.9800)
        .store();

    let subject_and_location = [
        ("subjects", "G1,F3,11"),
        ("latitude", "53.4084"),
        ("longitude", "-2.9916"),
        ("radius", "10"),
        ("has_vacancies", "true"),
    ];
    assert_eq!(codes(&run(&store, &subject_and_location)), vec!["MATHS_PHYSICS_CS"]);

    let mut with_provider = subject_and_location.to_vec();
    with_provider.push(("provider.provider_name", "Acme"));
    assert_eq!(codes(&run(&store, &with_provider)), vec!["MATHS_PHYSICS_CS"]);

    let mut sorted = subject_and_location.to_vec();
    sorted.push(("sort", "distance"));
    assert_eq!(codes(&run(&store, &sorted)), vec!["MATHS_PHYSICS_CS"]);
}

#[test]
fn test_integration_pages_partition_the_result() {
    let mut fixture = Fixture::default().provider(1, "SCH", "Mersey School", ProviderType::School);
    for id in 1..=7 {
        fixture = fixture.course(id, 1, &format!("C{id:02}"), |_| {});
    }
    let store = fixture.store();

    let query = CourseSearch::with_defaults()
        .search_params(&params(&[("sort", "name,provider.provider_name")]), CourseScope::all())
        .unwrap();

    let all = store.fetch_all(&query);
    let paged: Vec<RankedCourse> = (0..3)
        .flat_map(|page| store.fetch_page(&query, Page::new(page * 3, 3)))
        .collect();

    assert_eq!(paged, all);
    assert_eq!(store.count(&query), 7);
    assert!(store.fetch_page(&query, Page::new(21, 3)).is_empty());
}

#[test]
fn test_integration_search_is_idempotent() {
    let store = liverpool_dataset();
    let request = [
        ("latitude", "53.4084"),
        ("longitude", "-2.9916"),
        ("radius", "20"),
        ("expand_university", "true"),
        ("sort", "distance"),
    ];
    assert_eq!(run(&store, &request), run(&store, &request));
}

#[test]
fn test_integration_rendered_sql_matches_query_shape() {
    let query = CourseSearch::with_defaults()
        .search_params(
            &params(&[
                ("subjects", "G1"),
                ("latitude", "53.4084"),
                ("longitude", "-2.9916"),
                ("radius", "10"),
                ("sort", "distance"),
            ]),
            CourseScope::all().in_cycle(2024),
        )
        .unwrap();

    let page = render_page(&query, Page::new(20, 10));
    assert!(page.sql().contains("SELECT DISTINCT course.*"));
    assert!(page.sql().contains("AS distances ON distances.course_id = course.id"));
    assert!(page.sql().trim_end().ends_with("OFFSET $19"));

    let count = render_count(&query);
    assert!(!count.sql().contains("LIMIT"));
}
