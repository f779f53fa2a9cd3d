use crate::core::{
    dedup::DedupStrategy,
    distance::{boosted_distance, calculate_bounding_box, closest_site_distance, haversine_distance, is_eligible_site, is_within_bounding_box},
    filters::{reports_vacancies_for, CoursePredicate},
    ordering::{compare, RankKey, SortStrategy},
    pipeline::CourseQuery,
};
use crate::models::{
    Course, CourseScope, CourseSubject, Location, Page, Provider, RankedCourse, Site, SiteStatus, Subject,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Rows of every table the search reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub providers: Vec<Provider>,
    pub courses: Vec<Course>,
    pub sites: Vec<Site>,
    pub site_statuses: Vec<SiteStatus>,
    pub subjects: Vec<Subject>,
    pub course_subjects: Vec<CourseSubject>,
}

/// Executes course queries against an in-memory snapshot
///
/// Joins are evaluated row by row, so a course matching several sites or
/// subjects yields several rows until the dedup strategy collapses them,
/// the same as the SQL the Postgres executor renders.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    data: Dataset,
    providers_by_id: HashMap<i64, usize>,
    sites_by_id: HashMap<i64, usize>,
    statuses_by_course: HashMap<i64, Vec<usize>>,
    subjects_by_course: HashMap<i64, Vec<usize>>,
}

impl MemoryStore {
    pub fn new(data: Dataset) -> Self {
        let providers_by_id = data
            .providers
            .iter()
            .enumerate()
            .map(|(idx, provider)| (provider.id, idx))
            .collect();
        let sites_by_id = data
            .sites
            .iter()
            .enumerate()
            .map(|(idx, site)| (site.id, idx))
            .collect();

        let mut statuses_by_course: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, status) in data.site_statuses.iter().enumerate() {
            statuses_by_course.entry(status.course_id).or_default().push(idx);
        }

        let subject_idx: HashMap<i64, usize> = data
            .subjects
            .iter()
            .enumerate()
            .map(|(idx, subject)| (subject.id, idx))
            .collect();
        let mut subjects_by_course: HashMap<i64, Vec<usize>> = HashMap::new();
        for link in &data.course_subjects {
            if let Some(idx) = subject_idx.get(&link.subject_id) {
                subjects_by_course.entry(link.course_id).or_default().push(*idx);
            }
        }

        Self {
            data,
            providers_by_id,
            sites_by_id,
            statuses_by_course,
            subjects_by_course,
        }
    }

    /// One page of the ordered result
    pub fn fetch_page(&self, query: &CourseQuery, page: Page) -> Vec<RankedCourse> {
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        self.fetch_all(query)
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .collect()
    }

    /// The whole ordered result
    pub fn fetch_all(&self, query: &CourseQuery) -> Vec<RankedCourse> {
        let rows = self.filtered_rows(query);
        let courses = self.deduplicate(rows, query.dedup);
        self.rank(courses, &query.ordering)
    }

    /// Number of courses the query returns across all pages
    pub fn count(&self, query: &CourseQuery) -> u64 {
        self.fetch_all(query).len() as u64
    }

    fn provider(&self, course: &Course) -> Option<&Provider> {
        self.providers_by_id
            .get(&course.provider_id)
            .map(|idx| &self.data.providers[*idx])
    }

    fn in_scope(&self, course: &Course, scope: &CourseScope) -> bool {
        let Some(provider) = self.provider(course) else {
            return false;
        };

        scope
            .recruitment_cycle
            .map_or(true, |year| provider.recruitment_cycle_year == year)
            && scope
                .provider_code
                .as_ref()
                .map_or(true, |code| &provider.provider_code == code)
    }

    fn site_statuses<'a>(&'a self, course: &Course) -> impl Iterator<Item = (&'a Site, &'a SiteStatus)> + 'a {
        self.statuses_by_course
            .get(&course.id)
            .into_iter()
            .flatten()
            .filter_map(move |idx| {
                let status = &self.data.site_statuses[*idx];
                let site = self.sites_by_id.get(&status.site_id)?;
                Some((&self.data.sites[*site], status))
            })
    }

    fn subjects<'a>(&'a self, course: &Course) -> impl Iterator<Item = &'a Subject> + 'a {
        self.subjects_by_course
            .get(&course.id)
            .into_iter()
            .flatten()
            .map(move |idx| &self.data.subjects[*idx])
    }

    /// Rows `predicate` leaves for `course`: 0 filters it out, more than 1
    /// means the predicate joined several matching child rows
    fn joined_rows(&self, course: &Course, predicate: &CoursePredicate) -> usize {
        match predicate {
            CoursePredicate::ProgramTypeIn(types) => types.contains(&course.program_type) as usize,
            CoursePredicate::QualificationIn(quals) => quals.contains(&course.qualification) as usize,
            CoursePredicate::HasVacancies => self
                .site_statuses(course)
                .filter(|(_, status)| reports_vacancies_for(course, status))
                .count(),
            CoursePredicate::StudyModeIn(modes) => modes.contains(&course.study_mode) as usize,
            CoursePredicate::SubjectCodeIn(codes) => self
                .subjects(course)
                .filter(|subject| codes.contains(&subject.subject_code))
                .count(),
            CoursePredicate::ProviderName(name) => self.matches_provider_name(course, name) as usize,
            CoursePredicate::Send => course.is_send as usize,
            CoursePredicate::WithinRadius(location) => self.sites_within(course, location),
        }
    }

    fn matches_provider_name(&self, course: &Course, name: &str) -> bool {
        let delivers = self
            .provider(course)
            .is_some_and(|provider| provider.provider_name == name);
        let accredits = course.accredited_body_code.as_ref().is_some_and(|code| {
            self.data
                .providers
                .iter()
                .any(|provider| provider.provider_name == name && &provider.provider_code == code)
        });
        delivers || accredits
    }

    fn sites_within(&self, course: &Course, location: &Location) -> usize {
        let origin = location.origin.point();
        let bbox = calculate_bounding_box(location.origin.latitude, location.origin.longitude, location.radius_km);

        self.site_statuses(course)
            .filter(|(site, status)| is_eligible_site(site, status))
            .filter_map(|(site, _)| site.coordinate())
            .filter(|point| is_within_bounding_box(*point, &bbox))
            .filter(|point| haversine_distance(origin, *point) < location.radius_km)
            .count()
    }

    /// Scoped courses after every predicate, one entry per joined row
    fn filtered_rows(&self, query: &CourseQuery) -> Vec<&Course> {
        self.data
            .courses
            .iter()
            .filter(|course| self.in_scope(course, &query.scope))
            .flat_map(|course| {
                let rows = query
                    .predicates
                    .iter()
                    .map(|predicate| self.joined_rows(course, predicate))
                    .try_fold(1usize, |acc, n| (n > 0).then(|| acc.saturating_mul(n)))
                    .unwrap_or(0);
                std::iter::repeat(course).take(rows)
            })
            .collect()
    }

    fn deduplicate<'a>(&'a self, rows: Vec<&'a Course>, strategy: DedupStrategy) -> Vec<&'a Course> {
        match strategy {
            DedupStrategy::DistinctIds => {
                let ids: HashSet<i64> = rows.iter().map(|course| course.id).collect();
                self.data
                    .courses
                    .iter()
                    .filter(|course| ids.contains(&course.id))
                    .collect()
            }
            DedupStrategy::DistinctRows => {
                let mut seen = HashSet::new();
                rows.into_iter().filter(|course| seen.insert(course.id)).collect()
            }
        }
    }

    fn rank(&self, courses: Vec<&Course>, ordering: &SortStrategy) -> Vec<RankedCourse> {
        let mut ranked: Vec<RankedCourse> = courses
            .into_iter()
            .filter_map(|course| {
                let provider = self.provider(course)?;
                let (distance, boosted) = match ordering {
                    SortStrategy::Distance {
                        origin,
                        university_boost_km,
                    } => {
                        // Courses without an eligible site drop out of distance ordering
                        let distance = closest_site_distance(origin, self.site_statuses(course))?;
                        let boosted = university_boost_km
                            .map(|bonus| boosted_distance(distance, provider.provider_type, bonus));
                        (Some(distance), boosted)
                    }
                    _ => (None, None),
                };

                Some(RankedCourse {
                    course_id: course.id,
                    course_code: course.course_code.clone(),
                    name: course.name.clone(),
                    provider_code: provider.provider_code.clone(),
                    provider_name: provider.provider_name.clone(),
                    distance,
                    boosted_distance: boosted,
                })
            })
            .collect();

        // Stable, so `Natural` keeps storage order
        ranked.sort_by(|a, b| compare(ordering, &rank_key(a), &rank_key(b)));
        ranked
    }
}

fn rank_key(course: &RankedCourse) -> RankKey<'_> {
    RankKey {
        course_id: course.course_id,
        course_code: &course.course_code,
        provider_name: &course.provider_name,
        distance: course.distance,
        boosted_distance: course.boosted_distance,
    }
}
