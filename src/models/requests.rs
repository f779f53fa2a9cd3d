use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("{field} must be a positive integer, got {value:?}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("Invalid pagination: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Pagination parameters of a course search request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct PageParams {
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1, max = 500))]
    pub per_page: u32,
}

impl PageParams {
    /// Pull `page` and `per_page` out of the raw query, falling back to defaults,
    /// and check both are in range
    pub fn from_query(query: &HashMap<String, String>, default_per_page: u32) -> Result<Self, PageError> {
        let read = |field: &'static str, default: u32| match query.get(field).map(|v| v.trim()) {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse::<u32>().map_err(|_| PageError::NotAnInteger {
                field,
                value: raw.to_string(),
            }),
        };

        let params = Self {
            page: read("page", 1)?,
            per_page: read("per_page", default_per_page)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Offset/limit window for this page, with `per_page` capped at `max_per_page`
    pub fn window(&self, max_per_page: u32) -> Page {
        let limit = self.per_page.min(max_per_page).max(1);
        Page {
            offset: u64::from(self.page.saturating_sub(1)) * u64::from(limit),
            limit,
        }
    }
}

/// Offset/limit window applied to an ordered course query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u64,
    pub limit: u32,
}

impl Page {
    pub fn new(offset: u64, limit: u32) -> Self {
        Self { offset, limit }
    }
}
