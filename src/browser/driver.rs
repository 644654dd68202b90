use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::debug;

use super::{
    client::{FetchError, MovieListing, MovieSource},
    state::{CatalogBrowser, FetchRequest, SortOption, View},
};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SearchInput(String),
    Sort(SortOption),
    FirstPage,
    PrevPage,
    NextPage,
    LastPage,
}

impl UiEvent {
    /// Parses a terminal command: `/text` searches, `s title|year` sorts,
    /// `f`/`p`/`n`/`l` navigate.
    pub fn parse_command(line: &str) -> Option<Self> {
        if let Some(text) = line.strip_prefix('/') {
            return Some(UiEvent::SearchInput(text.to_string()));
        }
        let mut words = line.split_whitespace();
        let event = match (words.next()?, words.next()) {
            ("s", Some("title")) => UiEvent::Sort(SortOption::Title),
            ("s", Some("year")) => UiEvent::Sort(SortOption::YearNewest),
            ("f", None) => UiEvent::FirstPage,
            ("p", None) => UiEvent::PrevPage,
            ("n", None) => UiEvent::NextPage,
            ("l", None) => UiEvent::LastPage,
            _ => return None,
        };
        Some(event)
    }
}

/// A running browser: feed it events, watch its views.
pub struct BrowserHandle {
    pub events: mpsc::Sender<UiEvent>,
    pub views: watch::Receiver<View>,
    pub task: JoinHandle<()>,
}

pub fn spawn(source: Arc<dyn MovieSource>) -> BrowserHandle {
    let browser = CatalogBrowser::new();
    let (events_tx, events_rx) = mpsc::channel(64);
    let (views_tx, views_rx) = watch::channel(browser.view());
    let task = tokio::spawn(run(browser, source, events_rx, views_tx));
    BrowserHandle {
        events: events_tx,
        views: views_rx,
        task,
    }
}

type Completion = (u64, Result<MovieListing, FetchError>);

fn dispatch(source: &Arc<dyn MovieSource>, req: FetchRequest, done: &mpsc::UnboundedSender<Completion>) {
    let source = Arc::clone(source);
    let done = done.clone();
    tokio::spawn(async move {
        let result = source.fetch(&req).await;
        // the loop is gone once the handle is dropped
        let _ = done.send((req.generation, result));
    });
}

async fn run(
    mut browser: CatalogBrowser,
    source: Arc<dyn MovieSource>,
    mut events: mpsc::Receiver<UiEvent>,
    views: watch::Sender<View>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut search_deadline: Option<Instant> = None;

    dispatch(&source, browser.start(), &done_tx);
    views.send_replace(browser.view());

    loop {
        let request = tokio::select! {
            event = events.recv() => match event {
                None => break,
                Some(UiEvent::SearchInput(text)) => {
                    browser.set_search_input(text);
                    search_deadline = Some(Instant::now() + SEARCH_DEBOUNCE);
                    None
                }
                Some(UiEvent::Sort(sort)) => browser.set_sort(sort),
                Some(UiEvent::FirstPage) => browser.first_page(),
                Some(UiEvent::PrevPage) => browser.prev_page(),
                Some(UiEvent::NextPage) => browser.next_page(),
                Some(UiEvent::LastPage) => browser.last_page(),
            },
            Some((generation, result)) = done_rx.recv() => {
                browser.apply(generation, result);
                None
            }
            _ = sleep_until(search_deadline.unwrap_or_else(Instant::now)), if search_deadline.is_some() => {
                search_deadline = None;
                browser.commit_search()
            }
        };

        if let Some(req) = request {
            debug!(generation = req.generation, page = req.page, search = %req.search, "fetching");
            dispatch(&source, req, &done_tx);
        }
        views.send_replace(browser.view());
    }
    debug!("catalog browser stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::client::MovieSummary;
    use crate::browser::state::Status;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers with one movie titled after the search term. Searches for
    /// "slow" take a second.
    #[derive(Default)]
    struct FakeSource {
        seen: Mutex<Vec<FetchRequest>>,
    }

    impl FakeSource {
        fn searches(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.search.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MovieSource for FakeSource {
        async fn fetch(&self, req: &FetchRequest) -> Result<MovieListing, FetchError> {
            self.seen.lock().unwrap().push(req.clone());
            let delay = if req.search == "slow" { 1000 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(MovieListing {
                movies: vec![MovieSummary {
                    id: String::new(),
                    title: format!("result for {:?}", req.search),
                    year: None,
                }],
                total_pages: 4,
            })
        }
    }

    async fn pause(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            UiEvent::parse_command("/alien"),
            Some(UiEvent::SearchInput("alien".into()))
        );
        assert_eq!(UiEvent::parse_command("/"), Some(UiEvent::SearchInput(String::new())));
        assert_eq!(
            UiEvent::parse_command("s year"),
            Some(UiEvent::Sort(SortOption::YearNewest))
        );
        assert_eq!(UiEvent::parse_command("n"), Some(UiEvent::NextPage));
        assert_eq!(UiEvent::parse_command("n 3"), None);
        assert_eq!(UiEvent::parse_command(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn search_fires_once_after_quiet_period() {
        let source = Arc::new(FakeSource::default());
        let handle = spawn(source.clone());
        pause(50).await;
        assert_eq!(source.searches(), vec![""]);

        for text in ["a", "al", "ali"] {
            handle.events.send(UiEvent::SearchInput(text.into())).await.unwrap();
            pause(300).await;
        }
        // 300ms since the last keystroke: still waiting
        assert_eq!(source.searches(), vec![""]);

        pause(300).await;
        assert_eq!(source.searches(), vec!["", "ali"]);

        pause(100).await;
        let view = handle.views.borrow().clone();
        assert_eq!(view.status, Status::Success);
        assert_eq!(view.page, 1);
        assert_eq!(view.movies[0].title, "result for \"ali\"");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_response_does_not_overwrite_newer_one() {
        let source = Arc::new(FakeSource::default());
        let handle = spawn(source.clone());
        pause(50).await;

        handle.events.send(UiEvent::SearchInput("slow".into())).await.unwrap();
        pause(600).await;
        handle.events.send(UiEvent::SearchInput("fast".into())).await.unwrap();
        pause(600).await;
        assert_eq!(source.searches(), vec!["", "slow", "fast"]);

        // let the slow request finish after the fast one
        pause(1000).await;
        let view = handle.views.borrow().clone();
        assert_eq!(view.movies.len(), 1);
        assert_eq!(view.movies[0].title, "result for \"fast\"");
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_and_sort_fetch_immediately() {
        let source = Arc::new(FakeSource::default());
        let handle = spawn(source.clone());
        pause(50).await;

        handle.events.send(UiEvent::NextPage).await.unwrap();
        pause(50).await;
        assert_eq!(handle.views.borrow().page, 2);

        handle.events.send(UiEvent::Sort(SortOption::YearNewest)).await.unwrap();
        pause(50).await;
        let seen = source.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].page, 1);
        assert_eq!(seen[2].sort, SortOption::YearNewest);
    }

    #[tokio::test]
    async fn stops_when_events_are_closed() {
        let handle = spawn(Arc::new(FakeSource::default()));
        drop(handle.events);
        handle.task.await.unwrap();
    }
}
