//! Async driver for a [`RemoteTable`].
//!
//! Each fetch the table asks for runs on its own task. Outcomes come back over
//! a channel and are applied by the controller's owner, so the table itself is
//! only ever touched from one place.

use std::sync::Arc;

use dina_client::{FilterParam, ListResponse};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::TableConfig;
use crate::error::FetchError;
use crate::query::ListQuery;
use crate::source::ListSource;
use crate::table::{RemoteTable, TableView};

struct Completion {
    query: ListQuery,
    result: Result<ListResponse, FetchError>,
}

/// Drives a [`RemoteTable`] against a [`ListSource`].
pub struct TableController<S: ListSource> {
    table: RemoteTable,
    source: Arc<S>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<S: ListSource> TableController<S> {
    /// Create a controller. Call [`TableController::load`] for the first page.
    pub fn new(source: Arc<S>, config: TableConfig) -> Self {
        Self::with_table(source, RemoteTable::new(config))
    }

    /// Drive an existing table.
    pub fn with_table(source: Arc<S>, table: RemoteTable) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            table,
            source,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn table(&self) -> &RemoteTable {
        &self.table
    }

    pub fn view(&self) -> TableView {
        self.table.view()
    }

    /// Number of fetches whose outcome has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn load(&mut self) {
        let request = self.table.load();
        self.dispatch(request);
    }

    pub fn set_filter(&mut self, filter: Option<FilterParam>) {
        let request = self.table.on_filter_changed(filter);
        self.dispatch(request);
    }

    pub fn set_rsql(&mut self, rsql: impl Into<String>) {
        let request = self.table.on_rsql_changed(rsql);
        self.dispatch(request);
    }

    pub fn set_offset(&mut self, offset: u32) {
        let request = self.table.on_page_changed(offset);
        self.dispatch(request);
    }

    pub fn go_to_page(&mut self, page: u32) {
        let request = self.table.go_to_page(page);
        self.dispatch(request);
    }

    pub fn set_page_size(&mut self, limit: u32) {
        let request = self.table.on_page_size_changed(limit);
        self.dispatch(request);
    }

    pub fn toggle_sort(&mut self, column: &str, multi: bool) {
        let request = self.table.on_sort_changed(column, multi);
        self.dispatch(request);
    }

    pub fn refresh(&mut self) {
        let request = self.table.refresh();
        self.dispatch(request);
    }

    /// Take a pending scroll-to-top request. See [`RemoteTable::take_scroll_request`].
    pub fn take_scroll_request(&mut self) -> bool {
        self.table.take_scroll_request()
    }

    /// Wait for the next fetch to finish and apply it.
    ///
    /// Returns `None` when nothing is in flight, otherwise whether the outcome
    /// was applied (`false` for a stale response).
    pub async fn next_completion(&mut self) -> Option<bool> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(self.table.complete(&completion.query, completion.result))
    }

    /// Wait until every issued fetch has finished.
    pub async fn settle(&mut self) -> TableView {
        while self.next_completion().await.is_some() {}
        self.view()
    }

    fn dispatch(&mut self, request: Option<ListQuery>) {
        let Some(query) = request else {
            return;
        };

        self.in_flight += 1;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let path = query.path.clone();
            let params = query.to_params();
            let fetch = tokio::spawn(async move { source.fetch(&path, &params).await });
            let result = match fetch.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(path = %query.path, error = %e, "fetch task failed");
                    Err(FetchError::new(format!("fetch task failed: {e}")))
                }
            };
            if tx.send(Completion { query, result }).is_err() {
                debug!("table controller dropped before fetch finished");
            }
        });
    }
}

impl<S: ListSource> std::fmt::Debug for TableController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableController")
            .field("table", &self.table)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
