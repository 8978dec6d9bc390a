//! Remote table state machine.
//!
//! [`RemoteTable`] does no I/O. Every control returns the query to fetch, if
//! the change calls for one, and the caller reports the outcome back through
//! [`RemoteTable::complete`]. [`crate::TableController`] wires this to an
//! async [`crate::ListSource`].

use dina_client::{FilterParam, ListResponse, Resource};
use serde::Serialize;
use tracing::debug;

use crate::config::TableConfig;
use crate::error::FetchError;
use crate::query::{normalize_filter, ListQuery};
use crate::sort::SortRules;

/// What the rendering layer shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    /// Rows of the last successful response, kept while a newer fetch runs.
    pub rows: Vec<Resource>,
    /// Total matching rows, 0 while unknown.
    pub total_count: u64,
    /// Number of pages, when the total is known and non-zero.
    pub page_count: Option<u64>,
    /// Zero-based current page.
    pub current_page: u64,
    pub page_size: u32,
    pub loading: bool,
    #[serde(skip)]
    pub error: Option<FetchError>,
    pub show_pagination: bool,
}

/// State of a table bound to a remote list.
#[derive(Debug, Clone)]
pub struct RemoteTable {
    config: TableConfig,
    query: ListQuery,
    last_issued: Option<ListQuery>,
    loading: bool,
    last_response: Option<ListResponse>,
    error: Option<FetchError>,
    scroll_to_top: bool,
}

impl RemoteTable {
    /// Create a table. Nothing is fetched until [`RemoteTable::load`] or a
    /// control is called.
    pub fn new(config: TableConfig) -> Self {
        let query = ListQuery::from_config(&config);
        Self {
            config,
            query,
            last_issued: None,
            loading: false,
            last_response: None,
            error: None,
            scroll_to_top: false,
        }
    }

    /// Start with `filter` applied, without fetching.
    pub fn with_filter(mut self, filter: Option<FilterParam>) -> Self {
        self.query.filter = normalize_filter(filter);
        self
    }

    /// Start on the zero-based page `page`, without fetching.
    pub fn starting_at_page(mut self, page: u32) -> Self {
        self.query.page.offset = page.saturating_mul(self.query.page.limit);
        self
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The query currently in effect.
    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn last_response(&self) -> Option<&ListResponse> {
        self.last_response.as_ref()
    }

    /// Fetch the current query unless it was already requested.
    pub fn load(&mut self) -> Option<ListQuery> {
        if self.last_issued.as_ref() == Some(&self.query) {
            debug!(path = %self.query.path, "query unchanged, no fetch");
            return None;
        }
        self.loading = true;
        self.last_issued = Some(self.query.clone());
        debug!(
            path = %self.query.path,
            offset = self.query.page.offset,
            limit = self.query.page.limit,
            "issuing fetch"
        );
        Some(self.query.clone())
    }

    /// Apply a new compiled filter and go back to the first page.
    pub fn on_filter_changed(&mut self, filter: Option<FilterParam>) -> Option<ListQuery> {
        self.query.filter = normalize_filter(filter);
        self.set_offset(0);
        self.load()
    }

    /// Convenience for an RSQL filter; `""` clears the filter.
    pub fn on_rsql_changed(&mut self, rsql: impl Into<String>) -> Option<ListQuery> {
        self.on_filter_changed(Some(FilterParam::Rsql(rsql.into())))
    }

    /// Move to the row offset `offset`.
    pub fn on_page_changed(&mut self, offset: u32) -> Option<ListQuery> {
        self.set_offset(offset);
        self.load()
    }

    /// Move to the zero-based page `page`.
    pub fn go_to_page(&mut self, page: u32) -> Option<ListQuery> {
        let offset = page.saturating_mul(self.query.page.limit);
        self.on_page_changed(offset)
    }

    /// Change the page size and go back to the first page.
    pub fn on_page_size_changed(&mut self, limit: u32) -> Option<ListQuery> {
        self.query.page.limit = limit.max(1);
        self.set_offset(0);
        self.load()
    }

    /// Toggle the sort on `column`. See [`SortRules::toggle`].
    pub fn on_sort_changed(&mut self, column: &str, multi: bool) -> Option<ListQuery> {
        self.query.sort.toggle(column, multi);
        self.load()
    }

    /// Replace the sort rules.
    pub fn set_sort(&mut self, sort: SortRules) -> Option<ListQuery> {
        self.query.sort = sort;
        self.load()
    }

    /// Fetch the same query again.
    pub fn refresh(&mut self) -> Option<ListQuery> {
        self.query.revision += 1;
        self.load()
    }

    /// Report the outcome of a fetch.
    ///
    /// The outcome is applied only if `query` is still the query in effect;
    /// otherwise it is discarded. Returns whether it was applied.
    pub fn complete(
        &mut self,
        query: &ListQuery,
        result: Result<ListResponse, FetchError>,
    ) -> bool {
        if *query != self.query {
            debug!(
                path = %query.path,
                offset = query.page.offset,
                "discarding stale response"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(response) => {
                self.error = None;
                self.last_response = Some(response);
            }
            Err(err) => {
                debug!(path = %query.path, error = %err, "fetch failed");
                self.error = Some(err);
            }
        }
        true
    }

    /// Take a pending request to scroll to the top of the table.
    ///
    /// Set when a page change actually moved the offset.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_top)
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> TableView {
        let rows = self
            .last_response
            .as_ref()
            .map(|r| r.data.clone())
            .unwrap_or_default();
        let total_count = self
            .last_response
            .as_ref()
            .and_then(ListResponse::total_count)
            .unwrap_or(0);
        let limit = u64::from(self.query.page.limit.max(1));
        let page_count = (total_count > 0).then(|| total_count.div_ceil(limit));

        TableView {
            show_pagination: !rows.is_empty(),
            rows,
            total_count,
            page_count,
            current_page: u64::from(self.query.page.offset) / limit,
            page_size: self.query.page.limit,
            loading: self.loading,
            error: self.error.clone(),
        }
    }

    fn set_offset(&mut self, offset: u32) {
        if self.query.page.offset != offset {
            self.scroll_to_top = true;
            self.query.page.offset = offset;
        }
    }
}
