//! DINA Client - JSON:API client for DINA back-end services.
//!
//! This crate provides the async HTTP client list pages and forms use to
//! read and write resources.
//!
//! # Quick Start
//!
//! ```ignore
//! use dina_client::{ApiClient, ClientConfig, GetParams, Resource, SaveArgs, OperationsOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ClientConfig::new("https://dina.example.org/api"))?;
//!
//!     // List resources
//!     let params = GetParams::new()
//!         .with_rsql("materialSampleName==*101F*")
//!         .with_sort("-createdOn")
//!         .with_page(25, 0);
//!     let page = client.get("collection-api/material-sample", &params).await?;
//!     println!("{} total", page.total_count().unwrap_or(0));
//!
//!     // Create a resource
//!     let person = Resource::new("person").with_attribute("displayName", "Mat");
//!     client
//!         .save(vec![SaveArgs::Save(person)], &OperationsOptions::default())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod jsonapi;
pub mod operations;
pub mod params;

pub use cache::OptionCache;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::Error;
pub use jsonapi::{Document, ErrorObject, ErrorSource, ListResponse, Meta, Resource};
pub use operations::{
    Operation, OperationError, OperationKind, OperationResponse, OperationsOptions, SaveArgs,
};
pub use params::{FilterParam, GetParams, PageSpec};
