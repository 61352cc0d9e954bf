/// Paginated movie query engine
///
/// Keeps the displayed list equal to the concatenation of pages
/// `0..=page_index` fetched under the committed filter. Every fetch is tagged
/// with the generation it was issued under; a filter commit, a refresh or a
/// cancellation bumps the generation, so late completions are discarded
/// instead of being appended.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    error::{ApiError, ApiResult},
    models::{MovieSummary, PAGE_SIZE},
    services::{
        catalog::{CatalogApi, MovieFilter},
        session::SessionManager,
    },
};

/// Quiet period before typed filter text is committed
pub const DEBOUNCE: Duration = Duration::from_millis(700);

pub const EMPTY_MESSAGE: &str = "No movies found matching your criteria.";
pub const END_OF_RESULTS_MESSAGE: &str = "No more movies to load for the current criteria.";

/// Where listing pages come from
#[async_trait]
pub trait MovieSource: Send + Sync {
    async fn fetch_page(
        &self,
        filter: &MovieFilter,
        skip: usize,
        limit: usize,
    ) -> ApiResult<Vec<MovieSummary>>;
}

/// Catalog listing authenticated with whatever token the session holds at fetch time
pub struct CatalogSource {
    api: CatalogApi,
    session: Arc<SessionManager>,
}

impl CatalogSource {
    pub fn new(api: CatalogApi, session: Arc<SessionManager>) -> Self {
        Self { api, session }
    }
}

#[async_trait]
impl MovieSource for CatalogSource {
    async fn fetch_page(
        &self,
        filter: &MovieFilter,
        skip: usize,
        limit: usize,
    ) -> ApiResult<Vec<MovieSummary>> {
        let token = self.session.token();
        self.api
            .list_movies(skip, limit, filter, token.as_deref())
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryStatus {
    /// Nothing requested yet
    Idle,
    Loading,
    /// Items shown and more pages may exist
    Loaded,
    /// Items shown and the last page was short
    Exhausted,
    /// The committed filter matched nothing
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    /// Raw input, echoed immediately
    pub search_text: String,
    pub genres_text: String,
    /// Committed filter driving fetches
    pub active: MovieFilter,
    /// Last page successfully merged into `items`
    pub page_index: usize,
    pub items: Vec<MovieSummary>,
    pub status: QueryStatus,
    pub has_more: bool,
    pub in_flight: bool,
    pub generation: u64,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            genres_text: String::new(),
            active: MovieFilter::default(),
            page_index: 0,
            items: Vec::new(),
            status: QueryStatus::Idle,
            has_more: false,
            in_flight: false,
            generation: 0,
        }
    }
}

impl QueryState {
    /// Whether a load-more affordance should be offered
    pub fn can_load_more(&self) -> bool {
        !self.in_flight && self.has_more && !self.items.is_empty()
    }

    /// Inline message for the listing, distinguishing empty, finished and failed
    pub fn notice(&self) -> Option<&str> {
        match &self.status {
            QueryStatus::Empty => Some(EMPTY_MESSAGE),
            QueryStatus::Exhausted => Some(END_OF_RESULTS_MESSAGE),
            QueryStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    /// First page of a new filter epoch
    Reset,
    /// Next page of the current epoch
    Append { page_index: usize },
    /// Whole accumulated range, after an external mutation
    Reload,
}

#[derive(Debug, Clone, Copy)]
struct PageRequest {
    generation: u64,
    kind: FetchKind,
    skip: usize,
    limit: usize,
}

#[derive(Default)]
struct Tasks {
    debounce: Option<JoinHandle<()>>,
    fetch: Option<JoinHandle<()>>,
}

struct Inner {
    source: Arc<dyn MovieSource>,
    state: watch::Sender<QueryState>,
    tasks: Mutex<Tasks>,
}

/// One listing's query state; dropping it cancels pending work
pub struct MovieQuery {
    inner: Arc<Inner>,
}

impl MovieQuery {
    pub fn new(source: Arc<dyn MovieSource>) -> Self {
        let (state, _rx) = watch::channel(QueryState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                state,
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }

    /// Initial load of page 0 under the current (empty) filter
    pub fn start(&self) {
        let filter = self.inner.state.borrow().active.clone();
        Inner::reset(&self.inner, filter);
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner
            .state
            .send_modify(|state| state.search_text = text);
        Inner::schedule_commit(&self.inner);
    }

    pub fn set_genres_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner
            .state
            .send_modify(|state| state.genres_text = text);
        Inner::schedule_commit(&self.inner);
    }

    /// Commits a filter immediately, bypassing the debounce
    pub fn commit(&self, filter: MovieFilter) {
        Inner::commit(&self.inner, filter);
    }

    /// Appends the next page; ignored while a fetch is in flight or at the end
    pub fn load_more(&self) -> bool {
        let request = {
            let state = self.inner.state.borrow();
            if !state.can_load_more() {
                tracing::debug!(
                    in_flight = state.in_flight,
                    has_more = state.has_more,
                    "Load more ignored"
                );
                return false;
            }
            let page_index = state.page_index + 1;
            PageRequest {
                generation: state.generation,
                kind: FetchKind::Append { page_index },
                skip: page_index * PAGE_SIZE,
                limit: PAGE_SIZE,
            }
        };
        Inner::spawn_fetch(&self.inner, request);
        true
    }

    /// Refetches pages `0..=page_index` after an external mutation
    pub fn refresh(&self) {
        let request = {
            let mut request = None;
            self.inner.state.send_modify(|state| {
                state.generation += 1;
                request = Some(PageRequest {
                    generation: state.generation,
                    kind: FetchKind::Reload,
                    skip: 0,
                    limit: (state.page_index + 1) * PAGE_SIZE,
                });
            });
            request
        };
        if let Some(request) = request {
            Inner::spawn_fetch(&self.inner, request);
        }
    }

    /// Drops interest in pending commits and fetches
    pub fn cancel(&self) {
        self.inner.abort_tasks();
        self.inner.state.send_modify(|state| {
            state.generation += 1;
            state.in_flight = false;
            if state.status == QueryStatus::Loading {
                state.status = QueryStatus::Idle;
            }
        });
    }

    pub fn snapshot(&self) -> QueryState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.inner.state.subscribe()
    }
}

impl Drop for MovieQuery {
    fn drop(&mut self) {
        self.inner.abort_tasks();
    }
}

impl Inner {
    fn tasks(&self) -> std::sync::MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn abort_tasks(&self) {
        let mut tasks = self.tasks();
        if let Some(handle) = tasks.debounce.take() {
            handle.abort();
        }
        if let Some(handle) = tasks.fetch.take() {
            handle.abort();
        }
    }

    /// Replaces any pending commit with one firing after the quiet period
    fn schedule_commit(inner: &Arc<Inner>) {
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE).await;
            if let Some(inner) = weak.upgrade() {
                let filter = {
                    let state = inner.state.borrow();
                    MovieFilter::new(state.search_text.clone(), state.genres_text.clone())
                };
                Inner::commit(&inner, filter);
            }
        });

        let mut tasks = inner.tasks();
        if let Some(previous) = tasks.debounce.replace(handle) {
            previous.abort();
        }
    }

    fn commit(inner: &Arc<Inner>, filter: MovieFilter) {
        let unchanged = {
            let state = inner.state.borrow();
            state.active == filter && state.status != QueryStatus::Idle
        };
        if unchanged {
            tracing::debug!("Filter unchanged, commit skipped");
            return;
        }
        Inner::reset(inner, filter);
    }

    /// Starts a new epoch: clears the list and fetches page 0
    fn reset(inner: &Arc<Inner>, filter: MovieFilter) {
        tracing::info!(
            search = %filter.search,
            genres = %filter.genres,
            "Filter committed"
        );

        let mut request = None;
        inner.state.send_modify(|state| {
            state.generation += 1;
            state.active = filter;
            state.page_index = 0;
            state.items.clear();
            state.has_more = false;
            request = Some(PageRequest {
                generation: state.generation,
                kind: FetchKind::Reset,
                skip: 0,
                limit: PAGE_SIZE,
            });
        });

        if let Some(request) = request {
            Inner::spawn_fetch(inner, request);
        }
    }

    fn spawn_fetch(inner: &Arc<Inner>, request: PageRequest) {
        let filter = {
            let mut filter = MovieFilter::default();
            inner.state.send_modify(|state| {
                state.in_flight = true;
                state.status = QueryStatus::Loading;
                filter = state.active.clone();
            });
            filter
        };

        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            let result = task_inner
                .source
                .fetch_page(&filter, request.skip, request.limit)
                .await;
            task_inner.apply(request, result);
        });

        let mut tasks = inner.tasks();
        if let Some(previous) = tasks.fetch.replace(handle) {
            previous.abort();
        }
    }

    /// Merges a completed fetch, unless it belongs to a superseded generation
    fn apply(&self, request: PageRequest, result: ApiResult<Vec<MovieSummary>>) {
        self.state.send_if_modified(|state| {
            if state.generation != request.generation {
                tracing::debug!(
                    issued = request.generation,
                    current = state.generation,
                    "Discarding stale page"
                );
                return false;
            }

            state.in_flight = false;
            match result {
                Ok(page) => {
                    let received = page.len();
                    match request.kind {
                        FetchKind::Reset => {
                            state.items = page;
                            state.page_index = 0;
                        }
                        FetchKind::Append { page_index } => {
                            if !page.is_empty() {
                                state.items.extend(page);
                                state.page_index = page_index;
                            }
                        }
                        FetchKind::Reload => state.items = page,
                    }
                    state.has_more = received >= request.limit;
                    state.status = if state.items.is_empty() {
                        QueryStatus::Empty
                    } else if state.has_more {
                        QueryStatus::Loaded
                    } else {
                        QueryStatus::Exhausted
                    };
                    tracing::debug!(
                        received = received,
                        total = state.items.len(),
                        page_index = state.page_index,
                        "Page applied"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Listing fetch failed");
                    state.status = QueryStatus::Failed(failure_message(&e));
                }
            }
            true
        });
    }
}

fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Transport(_) => "Failed to fetch movies.".to_string(),
        other => other.user_message(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Notify;

    fn movie(id: i64, title: &str) -> MovieSummary {
        MovieSummary {
            id,
            title: title.to_string(),
            genres: None,
            resource_url: None,
            movie_lens_id: None,
            average_rating: None,
            num_ratings: None,
        }
    }

    fn catalog(prefix: &str, count: i64, offset: i64) -> Vec<MovieSummary> {
        (0..count)
            .map(|i| movie(offset + i, &format!("{} {}", prefix, i)))
            .collect()
    }

    /// In-memory source filtering by title substring, with optional gates per search term
    #[derive(Default)]
    struct StubSource {
        movies: Mutex<Vec<MovieSummary>>,
        calls: Mutex<Vec<(MovieFilter, usize, usize)>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        failure: Mutex<Option<String>>,
    }

    impl StubSource {
        fn with_movies(movies: Vec<MovieSummary>) -> Arc<Self> {
            Arc::new(Self {
                movies: Mutex::new(movies),
                ..Default::default()
            })
        }

        fn gate(&self, search: &str) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.gates
                .lock()
                .unwrap()
                .insert(search.to_string(), notify.clone());
            notify
        }

        fn fail_with(&self, message: Option<&str>) {
            *self.failure.lock().unwrap() = message.map(str::to_string);
        }

        fn calls(&self) -> Vec<(MovieFilter, usize, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MovieSource for StubSource {
        async fn fetch_page(
            &self,
            filter: &MovieFilter,
            skip: usize,
            limit: usize,
        ) -> ApiResult<Vec<MovieSummary>> {
            self.calls
                .lock()
                .unwrap()
                .push((filter.clone(), skip, limit));

            let gate = self.gates.lock().unwrap().get(&filter.search).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            if let Some(message) = self.failure.lock().unwrap().clone() {
                return Err(ApiError::Transport(message));
            }

            let movies = self.movies.lock().unwrap();
            Ok(movies
                .iter()
                .filter(|m| m.title.contains(&filter.search))
                .skip(skip)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    /// Lets spawned tasks run; time is paused so this is instantaneous
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_commits_trailing_value_once() {
        let source = StubSource::with_movies(vec![movie(1, "Toy Story"), movie(2, "Toy Soldiers")]);
        let query = MovieQuery::new(source.clone());

        query.set_search_text("Toy");
        tokio::time::sleep(Duration::from_millis(200)).await;
        query.set_search_text("Toy S");
        tokio::time::sleep(Duration::from_millis(300)).await;
        query.set_search_text("Toy Story");

        // Echo is immediate, commit is not
        let state = query.snapshot();
        assert_eq!(state.search_text, "Toy Story");
        assert_eq!(state.active.search, "");
        assert!(source.calls().is_empty());

        tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
        settle().await;

        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.search, "Toy Story");
        assert_eq!(calls[0].1, 0);

        let state = query.snapshot();
        assert_eq!(state.active.search, "Toy Story");
        assert_eq!(state.items, vec![movie(1, "Toy Story")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_genres_and_search_share_one_debounce() {
        let source = StubSource::with_movies(vec![]);
        let query = MovieQuery::new(source.clone());

        query.set_search_text("Heat");
        tokio::time::sleep(Duration::from_millis(400)).await;
        query.set_genres_text("Action,Crime");
        tokio::time::sleep(DEBOUNCE * 2).await;

        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, MovieFilter::new("Heat", "Action,Crime"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_page_from_superseded_filter_is_dropped() {
        let mut movies = catalog("Alpha", 3, 0);
        movies.extend(catalog("Beta", 2, 100));
        let source = StubSource::with_movies(movies);
        let alpha_gate = source.gate("Alpha");
        let query = MovieQuery::new(source.clone());

        query.commit(MovieFilter::new("Alpha", ""));
        settle().await;
        assert!(query.snapshot().in_flight);

        query.commit(MovieFilter::new("Beta", ""));
        alpha_gate.notify_one();
        settle().await;

        let state = query.snapshot();
        assert_eq!(state.active.search, "Beta");
        assert_eq!(state.items.len(), 2);
        assert!(state.items.iter().all(|m| m.title.starts_with("Beta")));
        assert!(!state.in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_rejects_stale_generation() {
        let source = StubSource::with_movies(catalog("Beta", 2, 0));
        let query = MovieQuery::new(source.clone());
        query.commit(MovieFilter::new("Beta", ""));
        settle().await;
        let before = query.snapshot();

        let stale = PageRequest {
            generation: before.generation - 1,
            kind: FetchKind::Append { page_index: 1 },
            skip: 10,
            limit: PAGE_SIZE,
        };
        query.inner.apply(stale, Ok(catalog("Alpha", 5, 50)));

        assert_eq!(query.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_clears_items_before_first_page() {
        let mut movies = catalog("Alpha", 12, 0);
        movies.extend(catalog("Beta", 2, 100));
        let source = StubSource::with_movies(movies);
        let beta_gate = source.gate("Beta");
        let query = MovieQuery::new(source.clone());

        query.commit(MovieFilter::new("Alpha", ""));
        settle().await;
        assert_eq!(query.snapshot().items.len(), 10);

        query.commit(MovieFilter::new("Beta", ""));
        let state = query.snapshot();
        assert!(state.items.is_empty());
        assert_eq!(state.page_index, 0);
        assert_eq!(state.status, QueryStatus::Loading);

        beta_gate.notify_one();
        settle().await;
        assert_eq!(query.snapshot().items.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_is_single_flight() {
        let source = StubSource::with_movies(catalog("Movie", 25, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;
        assert_eq!(query.snapshot().items.len(), 10);

        assert!(query.load_more());
        assert!(!query.load_more());
        settle().await;

        let state = query.snapshot();
        assert_eq!(state.items.len(), 20);
        assert_eq!(state.page_index, 1);
        assert_eq!(source.calls().len(), 2);
        assert_eq!(source.calls()[1].1, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_page_ends_results() {
        let source = StubSource::with_movies(catalog("Movie", 25, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;
        query.load_more();
        settle().await;
        query.load_more();
        settle().await;

        let state = query.snapshot();
        assert_eq!(state.items.len(), 25);
        assert!(!state.has_more);
        assert_eq!(state.status, QueryStatus::Exhausted);
        assert_eq!(state.notice(), Some(END_OF_RESULTS_MESSAGE));

        assert!(!query.load_more());
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_short_page_offers_no_load_more() {
        let source = StubSource::with_movies(catalog("Movie", 7, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;

        assert!(!query.snapshot().can_load_more());
        assert!(!query.load_more());
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_multiple_then_empty_page() {
        let source = StubSource::with_movies(catalog("Movie", 10, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;
        assert!(query.load_more());
        settle().await;

        let state = query.snapshot();
        assert_eq!(state.items.len(), 10);
        assert_eq!(state.page_index, 0);
        assert_eq!(state.status, QueryStatus::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_differs_from_failure() {
        let source = StubSource::with_movies(vec![]);
        let query = MovieQuery::new(source.clone());
        query.commit(MovieFilter::new("Inception", ""));
        settle().await;

        let empty = query.snapshot();
        assert_eq!(empty.status, QueryStatus::Empty);
        assert_eq!(empty.notice(), Some(EMPTY_MESSAGE));

        let failing = StubSource::with_movies(vec![]);
        failing.fail_with(Some("connection refused"));
        let query = MovieQuery::new(failing);
        query.commit(MovieFilter::new("Inception", ""));
        settle().await;

        let failed = query.snapshot();
        assert!(matches!(failed.status, QueryStatus::Failed(_)));
        assert_ne!(failed.notice(), empty.notice());
        assert!(failed.items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_more_keeps_items() {
        let source = StubSource::with_movies(catalog("Movie", 25, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;

        source.fail_with(Some("reset by peer"));
        query.load_more();
        settle().await;

        let state = query.snapshot();
        assert_eq!(state.items.len(), 10);
        assert_eq!(state.page_index, 0);
        assert!(matches!(state.status, QueryStatus::Failed(_)));
        assert!(state.can_load_more());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_reloads_accumulated_range() {
        let source = StubSource::with_movies(catalog("Movie", 25, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;
        query.load_more();
        settle().await;

        source.movies.lock().unwrap()[0].num_ratings = Some(1);
        query.refresh();
        settle().await;

        let last = source.calls().last().cloned().unwrap();
        assert_eq!((last.1, last.2), (0, 20));

        let state = query.snapshot();
        assert_eq!(state.items.len(), 20);
        assert_eq!(state.page_index, 1);
        assert_eq!(state.items[0].num_ratings, Some(1));
        assert_eq!(state.status, QueryStatus::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_supersedes_in_flight_load_more() {
        let source = StubSource::with_movies(catalog("Movie", 25, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;

        query.load_more();
        query.refresh();
        settle().await;

        let state = query.snapshot();
        assert_eq!(state.items.len(), 10);
        assert_eq!(state.page_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_commit_does_not_refetch() {
        let source = StubSource::with_movies(catalog("Movie", 3, 0));
        let query = MovieQuery::new(source.clone());
        query.start();
        settle().await;

        query.set_search_text("x");
        query.set_search_text("");
        tokio::time::sleep(DEBOUNCE * 2).await;

        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_commit() {
        let source = StubSource::with_movies(vec![]);
        let query = MovieQuery::new(source.clone());
        query.set_search_text("Alien");
        drop(query);

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert!(source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_page() {
        let source = StubSource::with_movies(catalog("Alpha", 3, 0));
        let gate = source.gate("Alpha");
        let query = MovieQuery::new(source.clone());
        query.commit(MovieFilter::new("Alpha", ""));
        settle().await;

        query.cancel();
        gate.notify_one();
        settle().await;

        let state = query.snapshot();
        assert!(state.items.is_empty());
        assert!(!state.in_flight);
    }
}
