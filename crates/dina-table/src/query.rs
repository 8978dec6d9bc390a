//! List query identity.
//!
//! Two queries that compare equal fetch the same rows. The table issues a
//! request only when its query stops being equal to the last one it issued,
//! and applies a response only while its query is still equal to the one the
//! response was fetched for.

use std::collections::BTreeMap;

use dina_client::{FilterParam, GetParams, PageSpec};

use crate::config::TableConfig;
use crate::sort::SortRules;

/// Everything that determines the rows a table shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub path: String,
    pub filter: Option<FilterParam>,
    pub sort: SortRules,
    pub page: PageSpec,
    pub omit_paging: bool,
    pub include: Option<String>,
    pub fields: BTreeMap<String, String>,
    /// Bumped to force a new fetch of otherwise identical parameters.
    pub revision: u64,
}

impl ListQuery {
    /// The first query of a table built from `config`.
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            path: config.path.clone(),
            filter: None,
            sort: config.initial_sort(),
            page: PageSpec::new(config.initial_page_size(), 0),
            omit_paging: config.omit_paging,
            include: config.include.clone(),
            fields: config.fields.clone(),
            revision: 0,
        }
    }

    /// Request parameters for this query.
    pub fn to_params(&self) -> GetParams {
        GetParams {
            filter: self.filter.clone(),
            sort: self.sort.to_param(),
            page: (!self.omit_paging).then_some(self.page),
            include: self.include.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// Normalize a filter so that "no filter" has one representation.
pub(crate) fn normalize_filter(filter: Option<FilterParam>) -> Option<FilterParam> {
    match filter {
        Some(FilterParam::Rsql(rsql)) if rsql.trim().is_empty() => None,
        Some(FilterParam::Structured(map)) if map.is_empty() => None,
        other => other,
    }
}
