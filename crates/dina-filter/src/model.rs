//! Nested serde representation of a filter tree.
//!
//! This is the shape a filter takes when it leaves the process: persisted
//! list-page state, filter files handed to the CLI, or a value supplied by a
//! form. Ids are informational; [`FilterTree::from_model`] allocates its own.

use serde::{Deserialize, Serialize};

use crate::tree::{
    FilterNode, FilterTree, GroupNode, GroupOperator, NodeId, Predicate, PredicateNode, SearchType,
};

/// A filter tree node in nested form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FilterModel {
    #[serde(rename = "FILTER_GROUP")]
    Group {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        operator: GroupOperator,
        #[serde(default)]
        children: Vec<FilterModel>,
    },
    #[serde(rename = "FILTER_ROW", rename_all = "camelCase")]
    Row {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        attribute: String,
        #[serde(default)]
        predicate: Predicate,
        #[serde(default)]
        search_type: SearchType,
        #[serde(default)]
        value: String,
    },
}

impl FilterModel {
    /// Create a group model.
    pub fn group(operator: GroupOperator, children: Vec<FilterModel>) -> Self {
        FilterModel::Group {
            id: None,
            operator,
            children,
        }
    }

    /// Create a row model.
    pub fn row(
        attribute: impl Into<String>,
        predicate: Predicate,
        search_type: SearchType,
        value: impl Into<String>,
    ) -> Self {
        FilterModel::Row {
            id: None,
            attribute: attribute.into(),
            predicate,
            search_type,
            value: value.into(),
        }
    }
}

impl FilterTree {
    /// Export the tree in nested form.
    pub fn to_model(&self) -> FilterModel {
        self.export(self.root_id())
    }

    fn export(&self, id: NodeId) -> FilterModel {
        match self.node(id) {
            Some(FilterNode::Group(g)) => FilterModel::Group {
                id: Some(g.id.get()),
                operator: g.operator,
                children: g.children.iter().map(|c| self.export(*c)).collect(),
            },
            Some(FilterNode::Predicate(p)) => FilterModel::Row {
                id: Some(p.id.get()),
                attribute: p.attribute.clone(),
                predicate: p.predicate,
                search_type: p.search_type,
                value: p.value.clone(),
            },
            None => unreachable!("exported ids come from the tree itself"),
        }
    }

    /// Build a tree from its nested form.
    ///
    /// Empty groups are dropped, non-root single-child groups are collapsed
    /// into their child, and a bare row becomes the only child of an AND
    /// root. A model with nothing left in it yields the default tree.
    pub fn from_model(model: &FilterModel, default_attribute: impl Into<String>) -> Self {
        let mut tree = FilterTree::empty(default_attribute.into());

        let root = match model {
            FilterModel::Group { .. } => tree.import(model, true),
            FilterModel::Row { .. } => tree.import(model, false).map(|row| {
                let root = tree.alloc_id();
                tree.insert_node(FilterNode::Group(GroupNode {
                    id: root,
                    operator: GroupOperator::And,
                    children: vec![row],
                }));
                root
            }),
        };

        match root {
            Some(root) => tree.set_root(root),
            None => tree.reset(),
        }
        debug_assert!(tree.validate().is_ok());
        tree
    }

    fn import(&mut self, model: &FilterModel, is_root: bool) -> Option<NodeId> {
        match model {
            FilterModel::Row {
                attribute,
                predicate,
                search_type,
                value,
                ..
            } => {
                let id = self.alloc_id();
                self.insert_node(FilterNode::Predicate(PredicateNode {
                    id,
                    attribute: attribute.clone(),
                    predicate: *predicate,
                    search_type: *search_type,
                    value: value.clone(),
                }));
                Some(id)
            }
            FilterModel::Group {
                operator, children, ..
            } => {
                let children: Vec<NodeId> = children
                    .iter()
                    .filter_map(|child| self.import(child, false))
                    .collect();

                match children.len() {
                    0 => None,
                    1 if !is_root => children.first().copied(),
                    _ => {
                        let id = self.alloc_id();
                        self.insert_node(FilterNode::Group(GroupNode {
                            id,
                            operator: *operator,
                            children,
                        }));
                        Some(id)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_model_json_shape() {
        let tree = FilterTree::new(&["name"]);
        let json = serde_json::to_value(tree.to_model()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "FILTER_GROUP",
                "id": 2,
                "operator": "AND",
                "children": [{
                    "type": "FILTER_ROW",
                    "id": 1,
                    "attribute": "name",
                    "predicate": "IS",
                    "searchType": "PARTIAL_MATCH",
                    "value": ""
                }]
            })
        );
    }

    #[test]
    fn test_accepts_spaced_is_not() {
        let model: FilterModel = serde_json::from_str(
            r#"{"type":"FILTER_ROW","attribute":"name","predicate":"IS NOT","searchType":"EXACT_MATCH","value":"x"}"#,
        )
        .unwrap();
        if let FilterModel::Row { predicate, .. } = model {
            assert_eq!(predicate, Predicate::IsNot);
        } else {
            panic!("expected row");
        }
    }

    #[test]
    fn test_from_model_wraps_bare_row() {
        let model = FilterModel::row("name", Predicate::Is, SearchType::ExactMatch, "x");
        let tree = FilterTree::from_model(&model, "name");
        assert_eq!(tree.root().children.len(), 1);
        assert_eq!(tree.predicates()[0].value, "x");
    }

    #[test]
    fn test_from_model_normalizes_groups() {
        let model = FilterModel::group(
            GroupOperator::And,
            vec![
                FilterModel::group(GroupOperator::Or, vec![]),
                FilterModel::group(
                    GroupOperator::Or,
                    vec![FilterModel::row(
                        "name",
                        Predicate::Is,
                        SearchType::ExactMatch,
                        "a",
                    )],
                ),
                FilterModel::row("name", Predicate::IsNot, SearchType::ExactMatch, "b"),
            ],
        );

        let tree = FilterTree::from_model(&model, "name");
        assert_eq!(tree.validate(), Ok(()));
        let root = tree.root();
        assert_eq!(root.children.len(), 2);
        assert!(root
            .children
            .iter()
            .all(|c| tree.predicate(*c).is_some()));
    }

    #[test]
    fn test_from_empty_model_is_default() {
        let model = FilterModel::group(GroupOperator::Or, vec![]);
        let tree = FilterTree::from_model(&model, "name");
        assert_eq!(tree.root().operator, GroupOperator::And);
        assert_eq!(tree.predicates().len(), 1);
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let mut tree = FilterTree::new(&["name"]);
        let first = tree.predicates()[0].id;
        tree.insert_after(first, GroupOperator::Or).unwrap();

        let rebuilt = FilterTree::from_model(&tree.to_model(), "name");
        assert_eq!(strip_ids(rebuilt.to_model()), strip_ids(tree.to_model()));
    }

    fn strip_ids(model: FilterModel) -> FilterModel {
        match model {
            FilterModel::Group {
                operator, children, ..
            } => FilterModel::group(operator, children.into_iter().map(strip_ids).collect()),
            FilterModel::Row {
                attribute,
                predicate,
                search_type,
                value,
                ..
            } => FilterModel::row(attribute, predicate, search_type, value),
        }
    }
}
