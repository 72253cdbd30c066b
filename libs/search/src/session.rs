//! Search session state machine
//!
//! A session owns one filter object and the last page it produced.
//! Editing filters never triggers a request; a request only goes out on
//! [`SearchSession::search`] or [`SearchSession::page_change`].
//!
//! ```text
//! Idle    --search-->             Loading
//! Loading --success-->            Ready
//! Loading --failure-->            Errored
//! Ready   --filter change-->      Ready    (page reset to 1, no request)
//! Ready   --search/page change--> Loading
//! Errored --search-->             Loading
//! ```
//!
//! Requests are split into [`SearchSession::begin_search`] and
//! [`SearchSession::complete`] so a caller can keep the session usable
//! while a request is in flight. Only the most recently issued request
//! may complete the session; anything older is discarded on arrival.

use std::time::Duration;

use common::error::{ApiError, ApiResult};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    backend::SearchBackend,
    cache::QueryCache,
    error::{SearchError, SearchResult},
    filters::{CacheKey, SearchFilters, SearchRequest},
    page::SearchResultPage,
};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Never searched
    Idle,
    /// A request is in flight
    Loading,
    /// The last request produced a page
    Ready,
    /// The last request failed
    Errored,
}

/// What happened to a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response became the session's current page
    Applied,
    /// A newer request was issued, or the filters changed; the response was dropped
    Stale,
}

/// Ticket for a request issued by a session
///
/// Owns everything needed to run the request, so it can be moved into a
/// task while the session stays available.
#[derive(Debug, Clone)]
pub struct PendingSearch {
    ticket: u64,
    sequence: u64,
    key: CacheKey,
    request: SearchRequest,
}

impl PendingSearch {
    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }

    /// Run the request against a backend
    pub async fn execute<B: SearchBackend + ?Sized>(&self, backend: &B) -> ApiResult<Value> {
        backend.fetch(&self.request).await
    }
}

/// One search screen's filters, state and last good page
#[derive(Debug)]
pub struct SearchSession<F: SearchFilters> {
    filters: F,
    state: SearchState,
    /// Ticket of the latest issued request; bumped to abandon in-flight work
    generation: u64,
    last_page: Option<SearchResultPage<F::Item>>,
    last_error: Option<SearchError>,
    cache: QueryCache,
    stale_after: Duration,
}

impl<F: SearchFilters> SearchSession<F> {
    /// Create an idle session
    pub fn new(filters: F, cache: QueryCache) -> Self {
        Self {
            filters,
            state: SearchState::Idle,
            generation: 0,
            last_page: None,
            last_error: None,
            cache,
            stale_after: Duration::ZERO,
        }
    }

    /// Serve cached pages younger than `stale_after` without a request
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn filters(&self) -> &F {
        &self.filters
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Last page received; kept while loading and after failures
    pub fn last_page(&self) -> Option<&SearchResultPage<F::Item>> {
        self.last_page.as_ref()
    }

    /// Failure of the latest request, cleared by the next success
    pub fn last_error(&self) -> Option<&SearchError> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == SearchState::Loading
    }

    /// Edit the filters
    ///
    /// The page goes back to 1 and nothing is fetched. A request still in
    /// flight no longer matches the filters and is abandoned.
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut F)) {
        edit(&mut self.filters);
        self.filters.pagination_mut().page = 1;

        if self.state == SearchState::Loading {
            self.generation += 1;
            self.state = match (&self.last_error, &self.last_page) {
                (Some(_), _) => SearchState::Errored,
                (None, Some(_)) => SearchState::Ready,
                (None, None) => SearchState::Idle,
            };
            debug!(
                "Abandoned in-flight {} search after filter change",
                F::ENTITY
            );
        }
    }

    /// Clamp a page number into the range of the last page received
    pub fn clamp_page(&self, page: u32) -> u32 {
        match &self.last_page {
            Some(last) => last.clamp_page(page),
            None => page.max(1),
        }
    }

    /// Issue a request for the current filters
    pub fn begin_search(&mut self) -> SearchResult<PendingSearch> {
        if let Err(e) = self.filters.validate() {
            warn!("Rejected {} search: {}", F::ENTITY, e);
            self.fail(e.clone());
            return Err(e);
        }

        self.generation += 1;
        self.state = SearchState::Loading;

        let request = self.filters.request();
        let key = request.cache_key();
        debug!("Issuing {} search #{}: {}", F::ENTITY, self.generation, key);

        Ok(PendingSearch {
            ticket: self.generation,
            sequence: self.cache.next_sequence(),
            key,
            request,
        })
    }

    /// Issue a request for another page of the current filters
    ///
    /// Pages past the end are sent as asked; the backend decides whether
    /// to clamp or reject them.
    pub fn begin_page_change(&mut self, page: u32) -> SearchResult<PendingSearch> {
        // Filters only move to the new page once it is known to be sendable
        let mut candidate = self.filters.clone();
        candidate.pagination_mut().page = page;
        if let Err(e) = candidate.validate() {
            warn!("Rejected {} page change to {}: {}", F::ENTITY, page, e);
            self.fail(e.clone());
            return Err(e);
        }

        self.filters = candidate;
        self.begin_search()
    }

    /// Apply the outcome of an issued request
    ///
    /// Successful responses always reach the cache (which keeps the newest
    /// per key); only the latest ticket updates the session.
    pub async fn complete(
        &mut self,
        pending: PendingSearch,
        outcome: ApiResult<Value>,
    ) -> SearchResult<Completion> {
        self.apply(pending, outcome, false).await
    }

    /// Run a search for the current filters to completion
    pub async fn search<B: SearchBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> SearchResult<&SearchResultPage<F::Item>> {
        let pending = self.begin_search()?;
        self.run(pending, backend).await
    }

    /// Run a search for another page to completion
    pub async fn page_change<B: SearchBackend + ?Sized>(
        &mut self,
        backend: &B,
        page: u32,
    ) -> SearchResult<&SearchResultPage<F::Item>> {
        let pending = self.begin_page_change(page)?;
        self.run(pending, backend).await
    }

    async fn run<B: SearchBackend + ?Sized>(
        &mut self,
        pending: PendingSearch,
        backend: &B,
    ) -> SearchResult<&SearchResultPage<F::Item>> {
        let cached = self.cache.fresh(&pending.key, self.stale_after).await;
        match cached {
            Some(value) => {
                debug!("Serving {} from cache", pending.key);
                self.apply(pending, Ok(value), true).await?;
            }
            None => {
                let outcome = pending.execute(backend).await;
                self.apply(pending, outcome, false).await?;
            }
        }

        self.last_page
            .as_ref()
            .ok_or_else(|| SearchError::Validation("search produced no page".to_string()))
    }

    async fn apply(
        &mut self,
        pending: PendingSearch,
        outcome: ApiResult<Value>,
        from_cache: bool,
    ) -> SearchResult<Completion> {
        if let (Ok(value), false) = (&outcome, from_cache) {
            self.cache
                .store(&pending.key, pending.sequence, value.clone())
                .await;
        }

        if pending.ticket != self.generation {
            debug!(
                "Discarding stale {} response #{} (latest is #{})",
                F::ENTITY,
                pending.ticket,
                self.generation
            );
            return Ok(Completion::Stale);
        }

        let page = outcome.map_err(SearchError::from).and_then(|value| {
            serde_json::from_value::<SearchResultPage<F::Item>>(value)
                .map_err(|e| SearchError::from(ApiError::Decode(e.to_string())))
        });

        match page {
            Ok(page) => {
                let page = page.normalized();
                info!(
                    "{} search returned {} of {} results (page {} of {})",
                    F::ENTITY,
                    page.len(),
                    page.total_count,
                    page.page,
                    page.total_pages
                );
                // Keep the session's page in step with what the backend served
                self.filters.pagination_mut().page = page.page.max(1);
                self.last_page = Some(page);
                self.last_error = None;
                self.state = SearchState::Ready;
                Ok(Completion::Applied)
            }
            Err(e) => {
                warn!("{} search failed: {}", F::ENTITY, e);
                // An undecodable body must not be served again from the slot
                self.cache.invalidate(&pending.key).await;
                self.fail(e.clone());
                Err(e)
            }
        }
    }

    fn fail(&mut self, error: SearchError) {
        self.last_error = Some(error);
        self.state = SearchState::Errored;
    }
}
