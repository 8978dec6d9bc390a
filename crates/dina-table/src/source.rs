//! Where table rows come from.

use std::sync::Arc;

use async_trait::async_trait;
use dina_client::{ApiClient, GetParams, ListResponse};

use crate::error::FetchError;

/// An async source of list pages.
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    /// Fetch one page of `path`.
    async fn fetch(&self, path: &str, params: &GetParams) -> Result<ListResponse, FetchError>;
}

#[async_trait]
impl ListSource for ApiClient {
    async fn fetch(&self, path: &str, params: &GetParams) -> Result<ListResponse, FetchError> {
        self.get(path, params).await.map_err(FetchError::from)
    }
}

#[async_trait]
impl<S: ListSource + ?Sized> ListSource for Arc<S> {
    async fn fetch(&self, path: &str, params: &GetParams) -> Result<ListResponse, FetchError> {
        (**self).fetch(path, params).await
    }
}
