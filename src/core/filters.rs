use crate::models::{
    Course, FilterCriteria, FundingType, Location, ProgramType, Qualification, SiteStatus, StudyMode,
};
use std::collections::BTreeSet;

/// One facet of a search, translated into a predicate over courses
///
/// Predicates compose by logical AND. Those that join child rows
/// (`widens_rows`) can yield several rows for one course.
#[derive(Debug, Clone, PartialEq)]
pub enum CoursePredicate {
    ProgramTypeIn(BTreeSet<ProgramType>),
    QualificationIn(BTreeSet<Qualification>),
    /// At least one findable site status reporting vacancies for the course's study mode
    HasVacancies,
    StudyModeIn(BTreeSet<StudyMode>),
    SubjectCodeIn(BTreeSet<String>),
    /// Delivered by, or accredited by, a provider with this name
    ProviderName(String),
    Send,
    /// At least one eligible site strictly inside the radius
    WithinRadius(Location),
}

impl CoursePredicate {
    pub fn widens_rows(&self) -> bool {
        matches!(
            self,
            CoursePredicate::HasVacancies
                | CoursePredicate::SubjectCodeIn(_)
                | CoursePredicate::WithinRadius(_)
        )
    }
}

/// Program types each funding category covers
///
/// Handed to the composer rather than looked up globally so callers can
/// supply their own table.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingTypeTable {
    salaried: Vec<ProgramType>,
    by_funding_type: Vec<(FundingType, Vec<ProgramType>)>,
}

impl FundingTypeTable {
    pub fn new(salaried: Vec<ProgramType>, by_funding_type: Vec<(FundingType, Vec<ProgramType>)>) -> Self {
        Self {
            salaried,
            by_funding_type,
        }
    }

    /// Program types selected by `funding=salary`
    pub fn salaried(&self) -> &[ProgramType] {
        &self.salaried
    }

    pub fn program_types(&self, funding_type: FundingType) -> &[ProgramType] {
        self.by_funding_type
            .iter()
            .find(|(candidate, _)| *candidate == funding_type)
            .map(|(_, types)| types.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for FundingTypeTable {
    fn default() -> Self {
        Self::new(
            vec![
                ProgramType::SchoolDirectSalariedTrainingProgramme,
                ProgramType::PgTeachingApprenticeship,
            ],
            vec![
                (
                    FundingType::Salary,
                    vec![ProgramType::SchoolDirectSalariedTrainingProgramme],
                ),
                (
                    FundingType::Apprenticeship,
                    vec![ProgramType::PgTeachingApprenticeship],
                ),
                (
                    FundingType::Fee,
                    vec![
                        ProgramType::HigherEducationProgramme,
                        ProgramType::ScittProgramme,
                        ProgramType::SchoolDirectTrainingProgramme,
                    ],
                ),
            ],
        )
    }
}

type FacetBuilder = fn(&FilterCriteria, &FundingTypeTable) -> Option<CoursePredicate>;

/// Facets in the order they are applied
const FACETS: [(&str, FacetBuilder); 9] = [
    ("funding", salary_facet),
    ("qualification", qualification_facet),
    ("has_vacancies", vacancies_facet),
    ("study_type", study_type_facet),
    ("subjects", subjects_facet),
    ("provider.provider_name", provider_name_facet),
    ("send_courses", send_facet),
    ("location", location_facet),
    ("funding_type", funding_type_facet),
];

/// Translates filter criteria into the list of predicates to apply
#[derive(Debug, Clone, Default)]
pub struct FilterComposer {
    funding: FundingTypeTable,
}

impl FilterComposer {
    pub fn new(funding: FundingTypeTable) -> Self {
        Self { funding }
    }

    pub fn funding_table(&self) -> &FundingTypeTable {
        &self.funding
    }

    /// Build the predicate for every facet present in `criteria`
    ///
    /// Absent facets contribute nothing.
    pub fn compose(&self, criteria: &FilterCriteria) -> Vec<CoursePredicate> {
        FACETS
            .iter()
            .filter_map(|(facet, build)| {
                let predicate = build(criteria, &self.funding)?;
                tracing::debug!(facet = *facet, ?predicate, "Applying search facet");
                Some(predicate)
            })
            .collect()
    }
}

fn salary_facet(criteria: &FilterCriteria, table: &FundingTypeTable) -> Option<CoursePredicate> {
    criteria
        .salary_only
        .then(|| CoursePredicate::ProgramTypeIn(table.salaried().iter().copied().collect()))
}

fn qualification_facet(criteria: &FilterCriteria, _: &FundingTypeTable) -> Option<CoursePredicate> {
    (!criteria.qualifications.is_empty())
        .then(|| CoursePredicate::QualificationIn(criteria.qualifications.iter().copied().collect()))
}

fn vacancies_facet(criteria: &FilterCriteria, _: &FundingTypeTable) -> Option<CoursePredicate> {
    criteria.has_vacancies.then_some(CoursePredicate::HasVacancies)
}

fn study_type_facet(criteria: &FilterCriteria, _: &FundingTypeTable) -> Option<CoursePredicate> {
    if criteria.study_types.is_empty() {
        return None;
    }

    // A course offering both modes satisfies any single-mode request
    let mut modes: BTreeSet<StudyMode> = criteria.study_types.iter().copied().collect();
    modes.insert(StudyMode::FullTimeOrPartTime);
    Some(CoursePredicate::StudyModeIn(modes))
}

fn subjects_facet(criteria: &FilterCriteria, _: &FundingTypeTable) -> Option<CoursePredicate> {
    (!criteria.subject_codes.is_empty())
        .then(|| CoursePredicate::SubjectCodeIn(criteria.subject_codes.iter().cloned().collect()))
}

fn provider_name_facet(criteria: &FilterCriteria, _: &FundingTypeTable) -> Option<CoursePredicate> {
    criteria
        .provider_name
        .clone()
        .map(CoursePredicate::ProviderName)
}

fn send_facet(criteria: &FilterCriteria, _: &FundingTypeTable) -> Option<CoursePredicate> {
    criteria.send_courses.then_some(CoursePredicate::Send)
}

fn location_facet(criteria: &FilterCriteria, _: &FundingTypeTable) -> Option<CoursePredicate> {
    criteria.location().map(CoursePredicate::WithinRadius)
}

fn funding_type_facet(criteria: &FilterCriteria, table: &FundingTypeTable) -> Option<CoursePredicate> {
    if criteria.funding_types.is_empty() {
        return None;
    }

    let program_types = criteria
        .funding_types
        .iter()
        .flat_map(|funding_type| table.program_types(*funding_type).iter().copied())
        .collect();
    Some(CoursePredicate::ProgramTypeIn(program_types))
}

/// Whether a site status counts towards the vacancies facet for `course`
#[inline]
pub fn reports_vacancies_for(course: &Course, status: &SiteStatus) -> bool {
    status.findable() && status.vac_status.covers(course.study_mode)
}
