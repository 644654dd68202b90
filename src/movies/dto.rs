use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::repo_types::Movie;
use crate::error::{AppError, AppResult};

/// Raw `GET /movies` query string. Everything is optional and parsed
/// leniently by [`super::query::ListingQuery`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub total_pages: u64,
}

/// Fields a client may change on a movie. Unknown keys are rejected.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoviePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullplot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1870..=2100;

impl MoviePatch {
    /// Parses an arbitrary JSON body into a checked patch.
    pub fn from_json(body: Value) -> AppResult<Self> {
        let Value::Object(raw) = &body else {
            return Err(AppError::BadRequest(
                "Update body must be a JSON object".into(),
            ));
        };
        // absent and null both deserialize to None; only absent means "keep"
        if let Some(key) = raw.iter().find(|(_, v)| v.is_null()).map(|(k, _)| k) {
            return Err(AppError::BadRequest(format!("{key} must not be null")));
        }
        let patch: MoviePatch = serde_json::from_value(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid update: {e}")))?;
        patch.validate()?;
        Ok(patch)
    }

    fn validate(&self) -> AppResult<()> {
        if self == &MoviePatch::default() {
            return Err(AppError::BadRequest("No updatable fields supplied".into()));
        }
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(AppError::BadRequest("title must not be blank".into()));
        }
        if matches!(self.year, Some(y) if !YEAR_RANGE.contains(&y)) {
            return Err(AppError::BadRequest(format!(
                "year must be between {} and {}",
                YEAR_RANGE.start(),
                YEAR_RANGE.end()
            )));
        }
        if self.runtime == Some(0) {
            return Err(AppError::BadRequest("runtime must be positive".into()));
        }
        Ok(())
    }

    /// The supplied fields only, ready to merge into a document.
    pub fn into_fields(self) -> anyhow::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!("patch serialized to non-object: {other}"),
        }
    }
}
