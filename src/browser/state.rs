//! Catalog browser state machine.
//!
//! Every change to page, sort or committed search produces a [`FetchRequest`]
//! tagged with a fresh generation. Only the response carrying the latest
//! generation is applied, so a slow stale response can never overwrite the
//! result of a newer request.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use super::client::{FetchError, MovieListing, MovieSummary};

pub const PAGE_SIZE: u64 = 10;
pub const LOAD_ERROR: &str = "Failed to load movies";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOption {
    #[default]
    Title,
    YearNewest,
}

impl SortOption {
    pub fn label(self) -> &'static str {
        match self {
            SortOption::Title => "Title (A-Z)",
            SortOption::YearNewest => "Year (Newest)",
        }
    }

    pub fn sort_by(self) -> &'static str {
        match self {
            SortOption::Title => "title",
            SortOption::YearNewest => "year",
        }
    }

    pub fn sort_order(self) -> &'static str {
        match self {
            SortOption::Title => "asc",
            SortOption::YearNewest => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Success,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub page: u64,
    pub limit: u64,
    pub search: String,
    pub sort: SortOption,
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub status: Status,
    pub movies: Vec<MovieSummary>,
    pub page: u64,
    pub total_pages: u64,
    pub search_input: String,
    pub sort: SortOption,
    pub can_first: bool,
    pub can_prev: bool,
    pub can_next: bool,
    pub can_last: bool,
}

#[derive(Debug, Clone)]
pub struct CatalogBrowser {
    movies: Vec<MovieSummary>,
    page: u64,
    total_pages: u64,
    status: Status,
    search_input: String,
    search: String,
    sort: SortOption,
    generation: u64,
}

impl Default for CatalogBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBrowser {
    pub fn new() -> Self {
        Self {
            movies: Vec::new(),
            page: 1,
            total_pages: 1,
            status: Status::Idle,
            search_input: String::new(),
            search: String::new(),
            sort: SortOption::default(),
            generation: 0,
        }
    }

    /// Initial load.
    pub fn start(&mut self) -> FetchRequest {
        self.fetch()
    }

    fn fetch(&mut self) -> FetchRequest {
        self.generation += 1;
        self.status = Status::Loading;
        FetchRequest {
            generation: self.generation,
            page: self.page,
            limit: PAGE_SIZE,
            search: self.search.clone(),
            sort: self.sort,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Records raw input. Nothing is fetched until [`Self::commit_search`].
    pub fn set_search_input(&mut self, text: impl Into<String>) {
        self.search_input = text.into();
    }

    /// Called once the input has been quiet for the debounce window.
    pub fn commit_search(&mut self) -> Option<FetchRequest> {
        if self.search == self.search_input && self.page == 1 {
            return None;
        }
        self.search = self.search_input.clone();
        self.page = 1;
        Some(self.fetch())
    }

    pub fn set_sort(&mut self, sort: SortOption) -> Option<FetchRequest> {
        if self.sort == sort && self.page == 1 {
            return None;
        }
        self.sort = sort;
        self.page = 1;
        Some(self.fetch())
    }

    fn at_first(&self) -> bool {
        self.page <= 1
    }

    fn at_last(&self) -> bool {
        self.page >= self.total_pages
    }

    fn go_to(&mut self, page: u64) -> Option<FetchRequest> {
        if page == self.page {
            return None;
        }
        self.page = page;
        Some(self.fetch())
    }

    pub fn first_page(&mut self) -> Option<FetchRequest> {
        if self.at_first() {
            return None;
        }
        self.go_to(1)
    }

    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        if self.at_first() {
            return None;
        }
        self.go_to(self.page - 1)
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        if self.at_last() {
            return None;
        }
        self.go_to(self.page + 1)
    }

    pub fn last_page(&mut self) -> Option<FetchRequest> {
        if self.at_last() {
            return None;
        }
        self.go_to(self.total_pages)
    }

    /// Applies a response. Returns `false` if it belongs to a superseded
    /// request and was dropped.
    pub fn apply(&mut self, generation: u64, result: Result<MovieListing, FetchError>) -> bool {
        if generation != self.generation {
            debug!(generation, latest = self.generation, "dropping stale response");
            return false;
        }
        match result {
            Ok(listing) => {
                self.movies = listing.movies;
                self.total_pages = listing.total_pages.max(1);
                self.status = Status::Success;
            }
            Err(e) => {
                debug!(error = %e, "fetch failed");
                self.movies.clear();
                self.status = Status::Error(LOAD_ERROR.into());
            }
        }
        true
    }

    pub fn view(&self) -> View {
        View {
            status: self.status.clone(),
            movies: self.movies.clone(),
            page: self.page,
            total_pages: self.total_pages,
            search_input: self.search_input.clone(),
            sort: self.sort,
            can_first: !self.at_first(),
            can_prev: !self.at_first(),
            can_next: !self.at_last(),
            can_last: !self.at_last(),
        }
    }
}

fn year_label(year: &Option<Value>) -> Option<String> {
    match year {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Movie Catalog  [sort: {}]  search: {:?}",
            self.sort.label(),
            self.search_input
        )?;
        match &self.status {
            Status::Loading => writeln!(f, "  loading...")?,
            Status::Error(msg) => writeln!(f, "  error: {msg}")?,
            Status::Success if self.movies.is_empty() => writeln!(f, "  no movies found")?,
            _ => {}
        }
        for m in &self.movies {
            match year_label(&m.year) {
                Some(year) => writeln!(f, "  * {} ({})", m.title, year)?,
                None => writeln!(f, "  * {}", m.title)?,
            }
        }
        let button = |label: &'static str, enabled: bool| if enabled { label } else { "-" };
        write!(
            f,
            "Page {} of {}   {} {} {} {}",
            self.page,
            self.total_pages,
            button("[first]", self.can_first),
            button("[prev]", self.can_prev),
            button("[next]", self.can_next),
            button("[last]", self.can_last),
        )
    }
}
