//! Terminal catalog browser: paging, sorting and debounced search over the
//! `/api/movies` listing.

pub mod client;
pub mod driver;
pub mod state;

pub use client::{HttpMovieSource, MovieSource};
pub use driver::{spawn, BrowserHandle, UiEvent};
pub use state::{CatalogBrowser, SortOption, View};
