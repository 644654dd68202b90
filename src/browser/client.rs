use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::state::FetchRequest;

/// Listing entry as the catalog view needs it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovieSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Kept loose: the dataset has both numeric and string years.
    #[serde(default)]
    pub year: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieListing {
    #[serde(default)]
    pub movies: Vec<MovieSummary>,
    #[serde(default)]
    pub total_pages: u64,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error! status: {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Where listing pages come from.
#[async_trait]
pub trait MovieSource: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<MovieListing, FetchError>;
}

#[derive(Clone)]
pub struct HttpMovieSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMovieSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn movies_url(&self) -> String {
        format!("{}/api/movies", self.base_url)
    }
}

#[async_trait]
impl MovieSource for HttpMovieSource {
    async fn fetch(&self, req: &FetchRequest) -> Result<MovieListing, FetchError> {
        let res = self
            .client
            .get(self.movies_url())
            .query(&[
                ("page", req.page.to_string()),
                ("limit", req.limit.to_string()),
                ("search", req.search.clone()),
                ("sortBy", req.sort.sort_by().to_string()),
                ("sortOrder", req.sort.sort_order().to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let listing = res.json::<MovieListing>().await?;
        debug!(generation = req.generation, movies = listing.movies.len(), "page fetched");
        Ok(listing)
    }
}
