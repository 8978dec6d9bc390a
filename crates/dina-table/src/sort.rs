//! Column sort rules.
//!
//! Rules are kept in the order columns were added and encode as the JSON:API
//! `sort` parameter, e.g. `name,-createdOn`.

use serde::{Deserialize, Serialize};

/// Sort on one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortColumn {
    pub id: String,
    #[serde(default)]
    pub desc: bool,
}

impl SortColumn {
    pub fn asc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: false,
        }
    }

    pub fn desc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: true,
        }
    }
}

/// Ordered multi-column sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortRules(Vec<SortColumn>);

impl SortRules {
    pub fn new(columns: Vec<SortColumn>) -> Self {
        Self(columns)
    }

    /// Parse a `sort` parameter. Blank entries are skipped.
    pub fn parse(param: &str) -> Self {
        Self(
            param
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != "-")
                .map(|s| match s.strip_prefix('-') {
                    Some(id) => SortColumn::desc(id),
                    None => SortColumn::asc(s),
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[SortColumn] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Advance `column` to its next state.
    ///
    /// With `multi`, the column cycles ascending, descending, removed within
    /// the existing rules; a column that is the only rule goes back to
    /// ascending instead of being removed. Without `multi`, the column
    /// replaces every other rule and alternates between ascending and
    /// descending.
    pub fn toggle(&mut self, column: &str, multi: bool) {
        let index = self.0.iter().position(|c| c.id == column);

        if !multi {
            let desc = matches!(index.map(|i| self.0[i].desc), Some(false));
            self.0 = vec![SortColumn {
                id: column.to_string(),
                desc,
            }];
            return;
        }

        match index {
            None => self.0.push(SortColumn::asc(column)),
            Some(i) if !self.0[i].desc => self.0[i].desc = true,
            Some(i) if self.0.len() == 1 => self.0[i].desc = false,
            Some(i) => {
                self.0.remove(i);
            }
        }
    }

    /// Encode as a `sort` parameter, `None` when there are no rules.
    pub fn to_param(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(
            self.0
                .iter()
                .map(|c| {
                    if c.desc {
                        format!("-{}", c.id)
                    } else {
                        c.id.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

impl From<Vec<SortColumn>> for SortRules {
    fn from(columns: Vec<SortColumn>) -> Self {
        Self(columns)
    }
}
