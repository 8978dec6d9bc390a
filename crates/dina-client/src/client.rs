//! JSON:API client.
//!
//! This module provides the `ApiClient` struct used by list pages and forms to
//! talk to a DINA back-end.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::jsonapi::{error_summary, Document, ErrorObject, ListResponse, Resource};
use crate::operations::{
    check_responses, null_missing, save_operations, Operation, OperationResponse,
    OperationsOptions, SaveArgs,
};
use crate::params::GetParams;

const JSON_API: &str = "application/vnd.api+json";
const JSON_PATCH: &str = "application/json-patch+json";

/// A client for a JSON:API back-end.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use dina_client::{ApiClient, ClientConfig, GetParams};
///
/// #[tokio::main]
/// async fn main() -> Result<(), dina_client::Error> {
///     let client = ApiClient::new(ClientConfig::default())?;
///
///     let params = GetParams::new().with_rsql("name==*101F*").with_page(25, 0);
///     let response = client.get("collection-api/material-sample", &params).await?;
///
///     println!("{} of {:?}", response.data.len(), response.total_count());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a client.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        Url::parse(&config.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        debug!(base_url = %config.base_url, "API client initialized");
        Ok(Self { http, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET a list or a single resource.
    pub async fn get(&self, path: &str, params: &GetParams) -> Result<ListResponse, Error> {
        let url = self.config.url(path);
        let query = params.to_query();
        debug!(url = %url, ?query, "GET");

        let response = self
            .http
            .get(&url)
            .query(&query)
            .header(ACCEPT, JSON_API)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(url, status, &body));
        }

        let document: Document = serde_json::from_str(&body)?;
        if !document.errors.is_empty() {
            return Err(error_document(url, status, document.errors));
        }
        Ok(ListResponse::from(document))
    }

    /// Run a batch of operations against the `operations` endpoint.
    ///
    /// Fails with [`Error::Operations`] when any entry has a non-2xx status,
    /// in which case the server applied none of them.
    pub async fn do_operations(
        &self,
        operations: &[Operation],
        options: &OperationsOptions,
    ) -> Result<Vec<OperationResponse>, Error> {
        if operations.is_empty() {
            debug!("empty operations batch skipped");
            return Ok(Vec::new());
        }

        let url = self.config.url("operations");
        debug!(url = %url, count = operations.len(), "PATCH operations");

        let response = self
            .http
            .patch(&url)
            .header(ACCEPT, JSON_PATCH)
            .header(CONTENT_TYPE, JSON_PATCH)
            .body(serde_json::to_vec(operations)?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let mut responses: Vec<OperationResponse> = match serde_json::from_str(&body) {
            Ok(responses) => responses,
            Err(_) if !status.is_success() => return Err(api_error(url, status, &body)),
            Err(e) => return Err(e.into()),
        };

        if options.return_null_for_missing {
            null_missing(&mut responses);
        }
        if let Err(e) = check_responses(&responses, options) {
            warn!(url = %url, error = %e, "operations batch failed");
            return Err(e);
        }
        Ok(responses)
    }

    /// Create, update or delete resources in one batch.
    ///
    /// Returns the saved resources in request order; deletions yield `None`.
    pub async fn save(
        &self,
        args: Vec<SaveArgs>,
        options: &OperationsOptions,
    ) -> Result<Vec<Option<Resource>>, Error> {
        let operations = save_operations(args, self.config.temp_id_start);
        let responses = self.do_operations(&operations, options).await?;
        Ok(responses.into_iter().map(|r| r.data).collect())
    }

    /// GET many resources by path in a single request.
    ///
    /// Duplicate paths are requested once. The result lines up with `paths`;
    /// missing resources are `None` when `options` allows it.
    pub async fn bulk_get(
        &self,
        paths: &[String],
        options: &OperationsOptions,
    ) -> Result<Vec<Option<Resource>>, Error> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut unique: Vec<&str> = Vec::new();
        for path in paths {
            if !unique.contains(&path.as_str()) {
                unique.push(path);
            }
        }

        let operations: Vec<Operation> = unique.iter().map(|p| Operation::get(*p)).collect();
        let responses = self.do_operations(&operations, options).await?;

        let by_path: HashMap<&str, Option<Resource>> = unique
            .into_iter()
            .zip(responses.into_iter().map(|r| r.data))
            .collect();

        Ok(paths
            .iter()
            .map(|p| by_path.get(p.as_str()).cloned().flatten())
            .collect())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

/// Build an error for a non-2xx response, reading JSON:API errors from the
/// body when it has any.
fn api_error(url: String, status: StatusCode, body: &str) -> Error {
    let errors = serde_json::from_str::<Document>(body)
        .map(|doc| doc.errors)
        .unwrap_or_default();
    error_document(url, status, errors)
}

/// Error for a response carrying JSON:API errors.
///
/// A 2xx response with an `errors` member takes its status from the first
/// error object that names one.
fn error_document(url: String, status: StatusCode, errors: Vec<ErrorObject>) -> Error {
    let status = if status.is_success() {
        errors
            .iter()
            .filter_map(|e| e.status.as_deref()?.parse::<u16>().ok())
            .find_map(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(status)
    } else {
        status
    };

    let mut message = if status.is_success() {
        String::new()
    } else {
        status.canonical_reason().unwrap_or_default().to_string()
    };
    let summary = error_summary(&errors);
    if !summary.is_empty() {
        if !message.is_empty() {
            message.push('\n');
        }
        message.push_str(&summary);
    }
    if status == StatusCode::BAD_GATEWAY {
        message = format!("Service unavailable: {message}");
    }

    Error::Api {
        url,
        status: status.as_u16(),
        message,
        errors,
    }
}
