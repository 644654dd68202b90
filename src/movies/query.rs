//! Turns raw listing parameters into a filter, a sort specification and a
//! skip/limit window.

use lazy_static::lazy_static;
use regex::Regex;

use super::dto::ListParams;
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Unrecognized tokens fall back to ascending.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" | "-1" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

/// One sort key: a dotted document path and its direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub path: Vec<String>,
    pub direction: SortDirection,
}

impl SortField {
    pub fn name(&self) -> String {
        self.path.join(".")
    }
}

/// Filter applied to both the page query and the count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFilter {
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub page: u64,
    pub limit: u64,
    pub filter: MovieFilter,
    pub sort: Vec<SortField>,
}

impl ListingQuery {
    pub fn from_params(params: &ListParams) -> AppResult<Self> {
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self {
            page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(params.limit.as_deref(), DEFAULT_LIMIT),
            filter: MovieFilter {
                title_contains: search,
            },
            sort: parse_sort(
                params.sort_by.as_deref().unwrap_or_default(),
                params.sort_order.as_deref().unwrap_or_default(),
            )?,
        })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

lazy_static! {
    static ref FIELD_PATH_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

/// Pairs comma-separated `sort_by` fields with `sort_order` directions by
/// position. Missing directions mean ascending; blank field segments are
/// skipped without shifting the pairing.
pub fn parse_sort(sort_by: &str, sort_order: &str) -> AppResult<Vec<SortField>> {
    let directions: Vec<&str> = sort_order.split(',').collect();
    let mut fields = Vec::new();
    for (i, raw) in sort_by.split(',').enumerate() {
        let field = raw.trim();
        if field.is_empty() {
            continue;
        }
        if !FIELD_PATH_RE.is_match(field) {
            return Err(AppError::BadRequest(format!("Invalid sort field: {field}")));
        }
        let direction = directions
            .get(i)
            .map(|d| SortDirection::parse(d))
            .unwrap_or(SortDirection::Asc);
        fields.push(SortField {
            path: field.split('.').map(str::to_string).collect(),
            direction,
        });
    }
    Ok(fields)
}

pub fn total_pages(count: u64, limit: u64) -> u64 {
    count.div_ceil(limit.max(1))
}
