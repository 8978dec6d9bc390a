//! GET request parameters and their query-string encoding.

use std::collections::BTreeMap;

/// Page window of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSpec {
    pub limit: u32,
    pub offset: u32,
}

impl PageSpec {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

/// The `filter` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterParam {
    /// `filter[rsql]=<expression>`
    Rsql(String),
    /// `filter[a][b]=<value>` for each dotted key `a.b`.
    Structured(BTreeMap<String, String>),
}

impl FilterParam {
    fn is_empty(&self) -> bool {
        match self {
            FilterParam::Rsql(rsql) => rsql.is_empty(),
            FilterParam::Structured(map) => map.is_empty(),
        }
    }
}

/// Parameters of a JSON:API GET.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GetParams {
    pub filter: Option<FilterParam>,
    pub sort: Option<String>,
    pub page: Option<PageSpec>,
    pub include: Option<String>,
    /// Sparse fieldsets, keyed by resource type.
    pub fields: BTreeMap<String, String>,
}

impl GetParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by an RSQL expression.
    pub fn with_rsql(mut self, rsql: impl Into<String>) -> Self {
        self.filter = Some(FilterParam::Rsql(rsql.into()));
        self
    }

    /// Add a structured filter entry.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = match self.filter.take() {
            Some(FilterParam::Structured(map)) => map,
            _ => BTreeMap::new(),
        };
        map.insert(key.into(), value.into());
        self.filter = Some(FilterParam::Structured(map));
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.page = Some(PageSpec::new(limit, offset));
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

    /// Encode as query pairs. Absent and empty values are left out.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();

        match &self.filter {
            Some(filter) if filter.is_empty() => {}
            Some(FilterParam::Rsql(rsql)) => query.push(("filter[rsql]".to_string(), rsql.clone())),
            Some(FilterParam::Structured(map)) => {
                for (key, value) in map {
                    let path: String = key.split('.').map(|s| format!("[{s}]")).collect();
                    query.push((format!("filter{path}"), value.clone()));
                }
            }
            None => {}
        }

        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            query.push(("sort".to_string(), sort.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page[limit]".to_string(), page.limit.to_string()));
            query.push(("page[offset]".to_string(), page.offset.to_string()));
        }
        if let Some(include) = self.include.as_deref().filter(|s| !s.is_empty()) {
            query.push(("include".to_string(), include.to_string()));
        }
        for (kind, fields) in &self.fields {
            query.push((format!("fields[{kind}]"), fields.clone()));
        }

        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_full_encoding() {
        let params = GetParams::new()
            .with_rsql("name==*101F*")
            .with_sort("-createdOn,name")
            .with_page(25, 50)
            .with_include("collection")
            .with_fields("collection", "name,code");

        assert_eq!(
            params.to_query(),
            pairs(&[
                ("filter[rsql]", "name==*101F*"),
                ("sort", "-createdOn,name"),
                ("page[limit]", "25"),
                ("page[offset]", "50"),
                ("include", "collection"),
                ("fields[collection]", "name,code"),
            ])
        );
    }

    #[test]
    fn test_empty_values_are_omitted() {
        let params = GetParams::new().with_rsql("").with_sort("");
        assert!(params.to_query().is_empty());
        assert!(GetParams::default().to_query().is_empty());
    }

    #[test]
    fn test_structured_filter() {
        let params = GetParams::new()
            .with_filter("group", "cnc")
            .with_filter("collection.name", "x");
        assert_eq!(
            params.to_query(),
            pairs(&[("filter[collection][name]", "x"), ("filter[group]", "cnc")])
        );
    }
}
