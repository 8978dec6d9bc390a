//! JSON-Patch style `operations` batches.
//!
//! A batch runs in a single server-side transaction: one failed entry means
//! nothing in the batch was applied.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::jsonapi::{ErrorObject, Resource};

/// HTTP method of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Get,
    Post,
    Patch,
    Delete,
}

/// One entry of an operations request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub op: OperationKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Resource>,
}

impl Operation {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            op: OperationKind::Get,
            path: path.into(),
            value: None,
        }
    }

    pub fn post(path: impl Into<String>, value: Resource) -> Self {
        Self {
            op: OperationKind::Post,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn patch(path: impl Into<String>, value: Resource) -> Self {
        Self {
            op: OperationKind::Patch,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            op: OperationKind::Delete,
            path: path.into(),
            value: None,
        }
    }
}

/// One entry of an operations response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    #[serde(default)]
    pub data: Option<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
}

impl OperationResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Options of an operations request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationsOptions {
    /// Turn 404 and 410 entries into `null` data instead of failing.
    pub return_null_for_missing: bool,
}

impl OperationsOptions {
    pub fn null_for_missing() -> Self {
        Self {
            return_null_for_missing: true,
        }
    }
}

/// Failure of one entry in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub index: usize,
    pub status: u16,
    /// Form-level message, if the entry reported one.
    pub message: Option<String>,
    /// Field-level messages keyed by JSON pointer.
    pub field_errors: BTreeMap<String, String>,
    pub errors: Vec<ErrorObject>,
}

/// One entry of a save batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveArgs {
    /// Create the resource when it has no id, update it otherwise.
    Save(Resource),
    /// Delete a resource.
    Delete { kind: String, id: String },
}

/// Replace missing-resource entries with `null` data.
pub(crate) fn null_missing(responses: &mut [OperationResponse]) {
    for response in responses.iter_mut() {
        if matches!(response.status, 404 | 410) {
            *response = OperationResponse {
                data: None,
                included: Vec::new(),
                status: 404,
                errors: Vec::new(),
            };
        }
    }
}

/// Fail the whole batch if any entry failed.
pub(crate) fn check_responses(
    responses: &[OperationResponse],
    options: &OperationsOptions,
) -> Result<(), Error> {
    let errors: Vec<OperationError> = responses
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_success())
        .filter(|(_, r)| !(options.return_null_for_missing && r.status == 404 && r.data.is_none()))
        .map(|(index, r)| operation_error(index, r))
        .collect();

    if errors.is_empty() {
        return Ok(());
    }

    let message = errors
        .iter()
        .map(|e| {
            e.message
                .clone()
                .unwrap_or_else(|| format!("operation {} failed with status {}", e.index, e.status))
        })
        .collect::<Vec<_>>()
        .join("\n");
    Err(Error::Operations { message, errors })
}

fn operation_error(index: usize, response: &OperationResponse) -> OperationError {
    let message = crate::jsonapi::error_summary(&response.errors);
    let field_errors = response
        .errors
        .iter()
        .filter_map(|e| Some((e.pointer()?.to_string(), e.detail.clone()?)))
        .collect();

    OperationError {
        index,
        status: response.status,
        message: (!message.is_empty()).then_some(message),
        field_errors,
        errors: response.errors.clone(),
    }
}

/// Build the operations of a save batch.
///
/// New resources are POSTed to their type with temporary ids counting down
/// from `temp_id_start`; existing ones are PATCHed at `type/id`.
pub(crate) fn save_operations(args: Vec<SaveArgs>, temp_id_start: i64) -> Vec<Operation> {
    let mut next_temp_id = temp_id_start;
    args.into_iter()
        .map(|arg| match arg {
            SaveArgs::Save(mut resource) => match resource.id.clone() {
                Some(id) => Operation::patch(format!("{}/{}", resource.kind, id), resource),
                None => {
                    resource.id = Some(next_temp_id.to_string());
                    next_temp_id -= 1;
                    Operation::post(resource.kind.clone(), resource)
                }
            },
            SaveArgs::Delete { kind, id } => Operation::delete(format!("{kind}/{id}")),
        })
        .collect()
}
