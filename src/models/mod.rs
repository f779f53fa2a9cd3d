// Model exports
pub mod criteria;
pub mod domain;
pub mod requests;
pub mod responses;

pub use criteria::{CourseScope, CriteriaError, FilterCriteria, FundingType, Location, Origin, SortKey, SortKeys};
pub use domain::{
    BoundingBox, Course, CourseSubject, Level, ProgramType, Provider, ProviderType, PublishState,
    Qualification, RankedCourse, Site, SiteState, SiteStatus, StudyMode, Subject, SubjectType,
    VacancyStatus,
};
pub use requests::{Page, PageError, PageParams};
pub use responses::{CourseSearchResponse, ErrorResponse, HealthResponse, SearchMeta};
