//! DINA remote tables
//!
//! This crate binds a compiled filter, page and sort state to a remote list
//! fetch and exposes what a list page renders: rows, total count, loading
//! flag and error.
//!
//! # Fetch lifecycle
//!
//! - A fetch is issued whenever the table's [`ListQuery`] stops being equal to
//!   the last query it fetched; identical queries are fetched once.
//! - `loading` turns on as soon as a fetch is issued.
//! - A response is applied only if its query is still the table's query, so
//!   the last query wins whatever order responses arrive in.
//! - The previous rows stay visible while a newer fetch is in flight.
//! - Changing the filter or page size goes back to the first page.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use dina_client::{ApiClient, ClientConfig};
//! use dina_table::{TableConfig, TableController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(ApiClient::new(ClientConfig::default())?);
//!     let mut table = TableController::new(client, TableConfig::new("agent-api/person"));
//!
//!     table.set_rsql("displayName==*Mat*");
//!     let view = table.settle().await;
//!     println!("{} of {}", view.rows.len(), view.total_count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod persist;
pub mod query;
pub mod sort;
pub mod source;
pub mod table;

pub use config::{TableConfig, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE_OPTIONS};
pub use controller::TableController;
pub use error::{Error, FetchError};
pub use persist::{
    load_list_state, save_list_state, FileStateStore, ListPageState, MemoryStateStore, StateStore,
};
pub use query::ListQuery;
pub use sort::{SortColumn, SortRules};
pub use source::ListSource;
pub use table::{RemoteTable, TableView};
