use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a request token does not name a known enum value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value {:?}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// How a course is funded and delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    HigherEducationProgramme,
    SchoolDirectTrainingProgramme,
    SchoolDirectSalariedTrainingProgramme,
    ScittProgramme,
    PgTeachingApprenticeship,
}

impl ProgramType {
    pub const ALL: [ProgramType; 5] = [
        ProgramType::HigherEducationProgramme,
        ProgramType::SchoolDirectTrainingProgramme,
        ProgramType::SchoolDirectSalariedTrainingProgramme,
        ProgramType::ScittProgramme,
        ProgramType::PgTeachingApprenticeship,
    ];

    /// Stored column value
    pub fn code(self) -> &'static str {
        match self {
            ProgramType::HigherEducationProgramme => "HE",
            ProgramType::SchoolDirectTrainingProgramme => "SD",
            ProgramType::SchoolDirectSalariedTrainingProgramme => "SS",
            ProgramType::ScittProgramme => "SC",
            ProgramType::PgTeachingApprenticeship => "TA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    FullTime,
    PartTime,
    FullTimeOrPartTime,
}

impl StudyMode {
    pub fn code(self) -> &'static str {
        match self {
            StudyMode::FullTime => "F",
            StudyMode::PartTime => "P",
            StudyMode::FullTimeOrPartTime => "B",
        }
    }
}

impl FromStr for StudyMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_time" => Ok(StudyMode::FullTime),
            "part_time" => Ok(StudyMode::PartTime),
            "full_time_or_part_time" => Ok(StudyMode::FullTimeOrPartTime),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualification {
    Qts,
    PgceWithQts,
    PgdeWithQts,
    Pgce,
    Pgde,
}

impl Qualification {
    pub fn as_str(self) -> &'static str {
        match self {
            Qualification::Qts => "qts",
            Qualification::PgceWithQts => "pgce_with_qts",
            Qualification::PgdeWithQts => "pgde_with_qts",
            Qualification::Pgce => "pgce",
            Qualification::Pgde => "pgde",
        }
    }
}

impl FromStr for Qualification {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qts" => Ok(Qualification::Qts),
            "pgce_with_qts" => Ok(Qualification::PgceWithQts),
            "pgde_with_qts" => Ok(Qualification::PgdeWithQts),
            "pgce" => Ok(Qualification::Pgce),
            "pgde" => Ok(Qualification::Pgde),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Primary,
    Secondary,
    FurtherEducation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    School,
    Scitt,
    University,
    LeadSchool,
}

impl ProviderType {
    pub fn code(self) -> &'static str {
        match self {
            ProviderType::School => "0",
            ProviderType::Scitt => "B",
            ProviderType::University => "O",
            ProviderType::LeadSchool => "Y",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Primary,
    Secondary,
    FurtherEducation,
    ModernLanguages,
    Discontinued,
}

/// Lifecycle state of a course running at a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteState {
    New,
    Running,
    Suspended,
    Discontinued,
}

impl SiteState {
    pub fn code(self) -> &'static str {
        match self {
            SiteState::New => "N",
            SiteState::Running => "R",
            SiteState::Suspended => "S",
            SiteState::Discontinued => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    Published,
    Unpublished,
}

impl PublishState {
    pub fn code(self) -> &'static str {
        match self {
            PublishState::Published => "Y",
            PublishState::Unpublished => "N",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacancyStatus {
    FullTimeVacancies,
    PartTimeVacancies,
    BothFullTimeAndPartTimeVacancies,
    NoVacancies,
}

impl VacancyStatus {
    pub fn code(self) -> &'static str {
        match self {
            VacancyStatus::FullTimeVacancies => "F",
            VacancyStatus::PartTimeVacancies => "P",
            VacancyStatus::BothFullTimeAndPartTimeVacancies => "B",
            VacancyStatus::NoVacancies => "",
        }
    }

    /// Whether this status reports vacancies a course of `mode` can fill
    pub fn covers(self, mode: StudyMode) -> bool {
        match (self, mode) {
            (VacancyStatus::NoVacancies, _) => false,
            (VacancyStatus::BothFullTimeAndPartTimeVacancies, _) => true,
            (_, StudyMode::FullTimeOrPartTime) => true,
            (VacancyStatus::FullTimeVacancies, StudyMode::FullTime) => true,
            (VacancyStatus::PartTimeVacancies, StudyMode::PartTime) => true,
            _ => false,
        }
    }

    /// Statuses that cover `mode`, used when rendering the filter as SQL
    pub fn covering(mode: StudyMode) -> Vec<VacancyStatus> {
        [
            VacancyStatus::FullTimeVacancies,
            VacancyStatus::PartTimeVacancies,
            VacancyStatus::BothFullTimeAndPartTimeVacancies,
        ]
        .into_iter()
        .filter(|status| status.covers(mode))
        .collect()
    }
}

/// Organisation delivering and/or accrediting courses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    pub provider_code: String,
    pub provider_name: String,
    pub provider_type: ProviderType,
    pub recruitment_cycle_year: i32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A trainable programme offered by a provider in a recruitment cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub provider_id: i64,
    pub course_code: String,
    pub name: String,
    pub qualification: Qualification,
    pub program_type: ProgramType,
    pub study_mode: StudyMode,
    pub level: Level,
    #[serde(default)]
    pub is_send: bool,
    #[serde(default)]
    pub accredited_body_code: Option<String>,
}

/// Physical location belonging to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub provider_id: i64,
    pub code: String,
    pub location_name: String,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Site {
    /// Sites without an address line or postcode cannot be geocoded reliably
    pub fn has_locatable_address(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.address1) || present(&self.postcode)
    }

    /// Geocoded position, if both coordinates are known
    pub fn coordinate(&self) -> Option<Point<f64>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Point::new(lng, lat)),
            _ => None,
        }
    }
}

/// Links a course to a site it runs at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStatus {
    pub id: i64,
    pub course_id: i64,
    pub site_id: i64,
    pub status: SiteState,
    pub publish: PublishState,
    pub vac_status: VacancyStatus,
}

impl SiteStatus {
    /// Running and published
    pub fn findable(&self) -> bool {
        self.status == SiteState::Running && self.publish == PublishState::Published
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub subject_code: String,
    pub subject_name: String,
    pub subject_type: SubjectType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSubject {
    pub course_id: i64,
    pub subject_id: i64,
}

/// One row of an executed course search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RankedCourse {
    pub course_id: i64,
    pub course_code: String,
    pub name: String,
    pub provider_code: String,
    pub provider_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boosted_distance: Option<f64>,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}
