//! Filterable attribute configuration.

use serde::{Deserialize, Serialize};

/// How an attribute's values are interpreted by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttributeKind {
    /// Free text, matched partially or exactly.
    #[default]
    Text,
    /// A calendar date; comparisons cover whole days.
    Date,
    /// A related resource picked from a list; the value is its id.
    Dropdown,
}

/// An attribute offered by a filter form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAttribute {
    /// Backend attribute path, e.g. `group.groupName`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: AttributeKind,
    /// Split `low-high` values into a between comparison.
    #[serde(default)]
    pub allow_range: bool,
    /// Split comma-separated values into an `=in=` list.
    #[serde(default)]
    pub allow_list: bool,
}

impl FilterAttribute {
    /// A free-text attribute.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            kind: AttributeKind::Text,
            allow_range: false,
            allow_list: false,
        }
    }

    /// A date attribute.
    pub fn date(name: impl Into<String>) -> Self {
        Self {
            kind: AttributeKind::Date,
            ..Self::text(name)
        }
    }

    /// A dropdown attribute.
    pub fn dropdown(name: impl Into<String>) -> Self {
        Self {
            kind: AttributeKind::Dropdown,
            ..Self::text(name)
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Allow `low-high` ranges.
    pub fn with_range(mut self) -> Self {
        self.allow_range = true;
        self
    }

    /// Allow comma-separated lists.
    pub fn with_list(mut self) -> Self {
        self.allow_list = true;
        self
    }

    /// Label shown to users, falling back to the attribute name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

impl From<&str> for FilterAttribute {
    fn from(name: &str) -> Self {
        Self::text(name)
    }
}

impl From<String> for FilterAttribute {
    fn from(name: String) -> Self {
        Self::text(name)
    }
}

impl AsRef<str> for FilterAttribute {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
