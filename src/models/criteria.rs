use crate::models::domain::{Qualification, StudyMode, UnknownVariant};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Errors raised while turning request parameters into criteria
#[derive(Debug, Error)]
pub enum CriteriaError {
    #[error("{field} must be a finite number, got {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("unknown {field} value: {source}")]
    UnknownValue {
        field: &'static str,
        #[source]
        source: UnknownVariant,
    },

    #[error("Invalid location: {0}")]
    InvalidLocation(#[from] ValidationErrors),

    #[error("distance ordering requires latitude and longitude")]
    MissingOrigin,
}

/// Requested funding category, as accepted by `funding_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingType {
    Salary,
    Apprenticeship,
    Fee,
}

impl FromStr for FundingType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "salary" => Ok(FundingType::Salary),
            "apprenticeship" => Ok(FundingType::Apprenticeship),
            "fee" => Ok(FundingType::Fee),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Search origin in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Origin {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Origin plus search radius in kilometres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(nested)]
    pub origin: Origin,
    #[validate(range(min = 0.0))]
    pub radius_km: f64,
}

/// Immutable, typed view of the filter parameters of one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub salary_only: bool,
    pub qualifications: Vec<Qualification>,
    pub has_vacancies: bool,
    pub study_types: Vec<StudyMode>,
    pub subject_codes: Vec<String>,
    pub provider_name: Option<String>,
    pub send_courses: bool,
    pub funding_types: Vec<FundingType>,
    pub origin: Option<Origin>,
    pub radius_km: Option<f64>,
    pub expand_university: bool,
}

impl FilterCriteria {
    /// Parse the flat request parameter map
    ///
    /// Absent or blank values leave the corresponding facet unset; they are
    /// never an error. Malformed numbers and unknown enum tokens are.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, CriteriaError> {
        let get = |key: &str| params.get(key).map(String::as_str);

        let latitude = parse_number(get("latitude"), "latitude")?;
        let longitude = parse_number(get("longitude"), "longitude")?;
        let radius_km = parse_number(get("radius"), "radius")?;

        let origin = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                let origin = Origin { latitude, longitude };
                origin.validate()?;
                Some(origin)
            }
            _ => None,
        };

        if let (Some(origin), Some(radius_km)) = (origin, radius_km) {
            Location { origin, radius_km }.validate()?;
        }

        Ok(Self {
            salary_only: get("funding") == Some("salary"),
            qualifications: parse_list(get("qualification"), "qualification")?,
            has_vacancies: parse_flag(get("has_vacancies")),
            study_types: parse_list(get("study_type"), "study_type")?,
            subject_codes: split_list(get("subjects")).map(str::to_string).collect(),
            provider_name: get("provider.provider_name")
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string),
            send_courses: parse_flag(get("send_courses")),
            funding_types: parse_list(get("funding_type"), "funding_type")?,
            origin,
            radius_km,
            expand_university: parse_flag(get("expand_university")),
        })
    }

    /// Location facet; only set when origin and radius are both present
    pub fn location(&self) -> Option<Location> {
        match (self.origin, self.radius_km) {
            (Some(origin), Some(radius_km)) => Some(Location { origin, radius_km }),
            _ => None,
        }
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn parse_list<T>(raw: Option<&str>, field: &'static str) -> Result<Vec<T>, CriteriaError>
where
    T: FromStr<Err = UnknownVariant> + PartialEq,
{
    let mut values = Vec::new();
    for token in split_list(raw) {
        let value = token
            .parse::<T>()
            .map_err(|source| CriteriaError::UnknownValue { field, source })?;
        if !values.contains(&value) {
            values.push(value);
        }
    }
    Ok(values)
}

fn parse_flag(raw: Option<&str>) -> bool {
    raw.is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

fn parse_number(raw: Option<&str>, field: &'static str) -> Result<Option<f64>, CriteriaError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(CriteriaError::NotANumber {
            field,
            value: raw.to_string(),
        }),
    }
}

/// A single sort token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SortKey {
    Name,
    NameDescending,
    ProviderName,
    ProviderNameDescending,
    Distance,
    Unrecognised(String),
}

impl SortKey {
    pub fn parse(token: &str) -> Self {
        match token {
            "name" => SortKey::Name,
            "-name" => SortKey::NameDescending,
            "provider.provider_name" => SortKey::ProviderName,
            "-provider.provider_name" => SortKey::ProviderNameDescending,
            "distance" => SortKey::Distance,
            other => SortKey::Unrecognised(other.to_string()),
        }
    }
}

/// Order-independent set of requested sort tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortKeys(BTreeSet<SortKey>);

impl SortKeys {
    /// Parse a comma separated `sort` parameter
    pub fn parse(raw: &str) -> Self {
        Self(split_list(Some(raw)).map(SortKey::parse).collect())
    }

    pub fn contains(&self, key: &SortKey) -> bool {
        self.0.contains(key)
    }

    /// True when the requested keys are exactly `keys`, in any order
    pub fn is_exactly(&self, keys: &[SortKey]) -> bool {
        self.0.len() == keys.len() && keys.iter().all(|key| self.0.contains(key))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SortKey> for SortKeys {
    fn from_iter<I: IntoIterator<Item = SortKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Pre-restricted course collection a search starts from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseScope {
    pub recruitment_cycle: Option<i32>,
    pub provider_code: Option<String>,
}

impl CourseScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_cycle(mut self, year: i32) -> Self {
        self.recruitment_cycle = Some(year);
        self
    }

    /// Courses delivered by the provider with this code
    pub fn for_provider(mut self, provider_code: impl Into<String>) -> Self {
        self.provider_code = Some(provider_code.into());
        self
    }
}
