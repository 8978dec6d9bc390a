//! Table configuration.

use std::collections::BTreeMap;

use crate::sort::{SortColumn, SortRules};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Page sizes offered by default.
pub const DEFAULT_PAGE_SIZE_OPTIONS: [u32; 5] = [25, 50, 100, 200, 500];

/// Configuration of one remote table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// API path listed by the table.
    pub path: String,
    pub default_page_size: u32,
    pub page_size_options: Vec<u32>,
    pub default_sort: Vec<SortColumn>,
    pub include: Option<String>,
    /// Sparse fieldsets, keyed by resource type.
    pub fields: BTreeMap<String, String>,
    /// Leave the page parameters out of requests.
    pub omit_paging: bool,
}

impl TableConfig {
    /// Create a configuration for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            default_sort: Vec::new(),
            include: None,
            fields: BTreeMap::new(),
            omit_paging: false,
        }
    }

    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_page_size_options(mut self, options: Vec<u32>) -> Self {
        self.page_size_options = options;
        self
    }

    pub fn with_default_sort(mut self, sort: Vec<SortColumn>) -> Self {
        self.default_sort = sort;
        self
    }

    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        self.include = Some(include.into());
        self
    }

    pub fn with_fields(mut self, kind: impl Into<String>, fields: impl Into<String>) -> Self {
        self.fields.insert(kind.into(), fields.into());
        self
    }

    pub fn with_omit_paging(mut self, omit: bool) -> Self {
        self.omit_paging = omit;
        self
    }

    /// The page size a new table starts with.
    ///
    /// A default that is not among the options falls back to the first
    /// option.
    pub fn initial_page_size(&self) -> u32 {
        if self.page_size_options.is_empty()
            || self.page_size_options.contains(&self.default_page_size)
        {
            self.default_page_size
        } else {
            self.page_size_options[0]
        }
    }

    pub(crate) fn initial_sort(&self) -> SortRules {
        SortRules::new(self.default_sort.clone())
    }
}
