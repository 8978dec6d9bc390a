//! Editable filter expression tree.
//!
//! The tree is stored as an arena of nodes addressed by [`NodeId`]. Groups
//! hold the ids of their children; parents are found by walking down from the
//! root, so there are no back-references to keep in sync.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// Identifier of a node within one tree.
///
/// Ids come from a per-tree counter and only ever grow, so a freshly created
/// node always has a larger id than every node already in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a node id from its raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Boolean operator joining the children of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    /// All children must match.
    And,
    /// Any child may match.
    Or,
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOperator::And => write!(f, "AND"),
            GroupOperator::Or => write!(f, "OR"),
        }
    }
}

/// Comparison a predicate performs on its attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Predicate {
    /// The attribute matches the value.
    #[default]
    Is,
    /// The attribute does not match the value.
    #[serde(alias = "IS NOT")]
    IsNot,
    /// The attribute is at or after the value (dates).
    From,
    /// The attribute is at or before the value (dates).
    Until,
}

/// How a predicate's value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchType {
    /// The value may appear anywhere in the attribute.
    #[default]
    PartialMatch,
    /// The attribute equals the value.
    ExactMatch,
    /// The attribute is null or empty; the value is ignored.
    BlankField,
}

/// A single attribute comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateNode {
    pub id: NodeId,
    pub attribute: String,
    pub predicate: Predicate,
    pub search_type: SearchType,
    /// May be empty while the user is still editing.
    pub value: String,
}

/// An AND/OR container of predicates and nested groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub id: NodeId,
    pub operator: GroupOperator,
    pub children: Vec<NodeId>,
}

/// A node in the filter tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    Predicate(PredicateNode),
    Group(GroupNode),
}

impl FilterNode {
    /// Get the id of this node.
    pub fn id(&self) -> NodeId {
        match self {
            FilterNode::Predicate(p) => p.id,
            FilterNode::Group(g) => g.id,
        }
    }

    /// Get the node as a predicate, if it is one.
    pub fn as_predicate(&self) -> Option<&PredicateNode> {
        match self {
            FilterNode::Predicate(p) => Some(p),
            FilterNode::Group(_) => None,
        }
    }

    /// Get the node as a group, if it is one.
    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            FilterNode::Group(g) => Some(g),
            FilterNode::Predicate(_) => None,
        }
    }
}

/// A change to one field of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Attribute(String),
    Predicate(Predicate),
    SearchType(SearchType),
    Value(String),
}

/// An editable, nested boolean filter expression.
///
/// The root is always a group with at least one child. Non-root groups always
/// have at least two children: a group left with one child after a removal is
/// replaced by that child in its own parent.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTree {
    nodes: BTreeMap<NodeId, FilterNode>,
    root: NodeId,
    next_id: u64,
    default_attribute: String,
}

impl FilterTree {
    /// Create the default tree: an AND group holding one blank predicate on
    /// the first attribute.
    pub fn new<S: AsRef<str>>(attributes: &[S]) -> Self {
        let default_attribute = attributes
            .first()
            .map(|a| a.as_ref().to_string())
            .unwrap_or_default();
        Self::with_default_attribute(default_attribute)
    }

    /// Create the default tree using `attribute` for fresh predicates.
    pub fn with_default_attribute(attribute: impl Into<String>) -> Self {
        let mut tree = Self::empty(attribute.into());
        tree.populate_default();
        tree
    }

    /// Tree with no nodes; callers must install a root before handing it out.
    pub(crate) fn empty(default_attribute: String) -> Self {
        Self {
            nodes: BTreeMap::new(),
            root: NodeId(0),
            next_id: 1,
            default_attribute,
        }
    }

    /// Get the root group's id.
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Get the root group.
    pub fn root(&self) -> &GroupNode {
        match self.nodes.get(&self.root) {
            Some(FilterNode::Group(g)) => g,
            _ => unreachable!("filter tree root is always a group"),
        }
    }

    /// Attribute assigned to newly inserted predicates.
    pub fn default_attribute(&self) -> &str {
        &self.default_attribute
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&FilterNode> {
        self.nodes.get(&id)
    }

    /// Look up a predicate by id.
    pub fn predicate(&self, id: NodeId) -> Option<&PredicateNode> {
        self.node(id).and_then(FilterNode::as_predicate)
    }

    /// Look up a group by id.
    pub fn group(&self, id: NodeId) -> Option<&GroupNode> {
        self.node(id).and_then(FilterNode::as_group)
    }

    /// Number of nodes in the tree, groups included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least a root and one predicate.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find the group directly containing `id`. The root has no parent.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            if let Some(FilterNode::Group(g)) = self.nodes.get(&current) {
                if g.children.contains(&id) {
                    return Some(current);
                }
                stack.extend(g.children.iter().copied());
            }
        }
        None
    }

    /// Depth of a node, the root being at depth 0.
    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// Depth of the deepest node.
    pub fn depth(&self) -> usize {
        self.nodes
            .keys()
            .filter_map(|id| self.depth_of(*id))
            .max()
            .unwrap_or(0)
    }

    /// Predicates in display order (depth-first, left to right).
    pub fn predicates(&self) -> Vec<&PredicateNode> {
        let mut out = Vec::new();
        self.collect_predicates(self.root, &mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, id: NodeId, out: &mut Vec<&'a PredicateNode>) {
        match self.nodes.get(&id) {
            Some(FilterNode::Predicate(p)) => out.push(p),
            Some(FilterNode::Group(g)) => {
                for child in &g.children {
                    self.collect_predicates(*child, out);
                }
            }
            None => {}
        }
    }

    /// Insert a blank predicate after `target`.
    ///
    /// When the target's parent group already uses `operator` the predicate
    /// becomes the target's next sibling. Otherwise the target and the new
    /// predicate are wrapped together in a new group using `operator`, which
    /// takes the target's place. Targeting the root appends to it, or wraps it
    /// in a new root group when the operators differ.
    ///
    /// Returns the id of the new predicate.
    pub fn insert_after(
        &mut self,
        target: NodeId,
        operator: GroupOperator,
    ) -> Result<NodeId, TreeError> {
        if !self.nodes.contains_key(&target) {
            return Err(TreeError::NodeNotFound(target));
        }

        let new_predicate = match self.parent_of(target) {
            None => {
                let root_operator = self.root().operator;
                let new_predicate = self.fresh_predicate();
                if root_operator == operator {
                    self.group_mut(self.root).children.push(new_predicate);
                } else {
                    let new_root = self.alloc_id();
                    self.nodes.insert(
                        new_root,
                        FilterNode::Group(GroupNode {
                            id: new_root,
                            operator,
                            children: vec![self.root, new_predicate],
                        }),
                    );
                    self.root = new_root;
                }
                new_predicate
            }
            Some(parent) => {
                let new_predicate = self.fresh_predicate();
                let parent_group = self.group_mut(parent);
                let index = position(&parent_group.children, target);

                if parent_group.operator == operator {
                    parent_group.children.insert(index + 1, new_predicate);
                } else {
                    let wrapper = self.alloc_id();
                    self.nodes.insert(
                        wrapper,
                        FilterNode::Group(GroupNode {
                            id: wrapper,
                            operator,
                            children: vec![target, new_predicate],
                        }),
                    );
                    self.group_mut(parent).children[index] = wrapper;
                }
                new_predicate
            }
        };

        self.debug_check();
        Ok(new_predicate)
    }

    /// Remove a node (and, for a group, everything under it).
    ///
    /// A non-root group left with a single child is replaced by that child.
    /// Removing the root or the last predicate resets the tree to its default
    /// shape with fresh ids.
    pub fn remove(&mut self, target: NodeId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(&target) {
            return Err(TreeError::NodeNotFound(target));
        }
        if target == self.root {
            self.reset();
            return Ok(());
        }

        let parent = self
            .parent_of(target)
            .ok_or(TreeError::OrphanNode(target))?;
        self.drop_subtree(target);
        let remaining = {
            let parent_group = self.group_mut(parent);
            parent_group.children.retain(|child| *child != target);
            parent_group.children.clone()
        };

        match remaining.as_slice() {
            [] => self.reset(),
            [only] if parent != self.root => {
                let only = *only;
                if let Some(grandparent) = self.parent_of(parent) {
                    let grandparent_group = self.group_mut(grandparent);
                    let index = position(&grandparent_group.children, parent);
                    grandparent_group.children[index] = only;
                    self.nodes.remove(&parent);
                }
            }
            _ => {}
        }

        self.debug_check();
        Ok(())
    }

    /// Change one field of a predicate.
    ///
    /// Returns `Ok(false)` without changing anything when `target` is a group.
    pub fn update_field(&mut self, target: NodeId, update: FieldUpdate) -> Result<bool, TreeError> {
        match self.nodes.get_mut(&target) {
            None => Err(TreeError::NodeNotFound(target)),
            Some(FilterNode::Group(_)) => Ok(false),
            Some(FilterNode::Predicate(p)) => {
                match update {
                    FieldUpdate::Attribute(attribute) => p.attribute = attribute,
                    FieldUpdate::Predicate(predicate) => p.predicate = predicate,
                    FieldUpdate::SearchType(search_type) => p.search_type = search_type,
                    FieldUpdate::Value(value) => p.value = value,
                }
                Ok(true)
            }
        }
    }

    /// Replace the whole tree with the default shape.
    ///
    /// The id counter keeps running, so ids from before the reset are never
    /// reused.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.populate_default();
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), TreeError> {
        let root = self
            .nodes
            .get(&self.root)
            .ok_or(TreeError::NodeNotFound(self.root))?;
        if root.as_group().is_none() {
            return Err(TreeError::RootNotGroup(self.root));
        }

        let mut seen = BTreeSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(TreeError::DuplicateNode(id));
            }
            if id.get() >= self.next_id {
                return Err(TreeError::ForeignId(id));
            }
            match self.nodes.get(&id) {
                None => return Err(TreeError::NodeNotFound(id)),
                Some(FilterNode::Predicate(_)) => {}
                Some(FilterNode::Group(g)) => {
                    if g.children.is_empty() {
                        return Err(TreeError::EmptyGroup(id));
                    }
                    if g.children.len() == 1 && id != self.root {
                        return Err(TreeError::SingletonGroup(id));
                    }
                    stack.extend(g.children.iter().copied());
                }
            }
        }

        if let Some(orphan) = self.nodes.keys().find(|id| !seen.contains(id)) {
            return Err(TreeError::OrphanNode(*orphan));
        }
        Ok(())
    }

    fn populate_default(&mut self) {
        let predicate = self.fresh_predicate();
        let root = self.alloc_id();
        self.nodes.insert(
            root,
            FilterNode::Group(GroupNode {
                id: root,
                operator: GroupOperator::And,
                children: vec![predicate],
            }),
        );
        self.root = root;
    }

    pub(crate) fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert_node(&mut self, node: FilterNode) {
        self.nodes.insert(node.id(), node);
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    fn fresh_predicate(&mut self) -> NodeId {
        let id = self.alloc_id();
        self.nodes.insert(
            id,
            FilterNode::Predicate(PredicateNode {
                id,
                attribute: self.default_attribute.clone(),
                predicate: Predicate::Is,
                search_type: SearchType::PartialMatch,
                value: String::new(),
            }),
        );
        id
    }

    fn group_mut(&mut self, id: NodeId) -> &mut GroupNode {
        match self.nodes.get_mut(&id) {
            Some(FilterNode::Group(g)) => g,
            _ => unreachable!("parent lookups only ever return groups"),
        }
    }

    fn drop_subtree(&mut self, id: NodeId) {
        if let Some(FilterNode::Group(g)) = self.nodes.remove(&id) {
            for child in g.children {
                self.drop_subtree(child);
            }
        }
    }

    fn debug_check(&self) {
        debug_assert!(
            self.validate().is_ok(),
            "filter tree invariant violated: {:?}",
            self.validate()
        );
    }
}

fn position(children: &[NodeId], id: NodeId) -> usize {
    children
        .iter()
        .position(|child| *child == id)
        .unwrap_or(children.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Compact rendering of the tree shape, e.g. `AND[OR[p,p],p]`.
    fn shape(tree: &FilterTree) -> String {
        fn walk(tree: &FilterTree, id: NodeId) -> String {
            match tree.node(id).unwrap() {
                FilterNode::Predicate(_) => "p".to_string(),
                FilterNode::Group(g) => {
                    let children: Vec<String> =
                        g.children.iter().map(|c| walk(tree, *c)).collect();
                    format!("{}[{}]", g.operator, children.join(","))
                }
            }
        }
        walk(tree, tree.root_id())
    }

    fn first_predicate(tree: &FilterTree) -> NodeId {
        tree.predicates()[0].id
    }

    #[test]
    fn test_default_tree() {
        let tree = FilterTree::new(&["name", "description"]);
        assert_eq!(shape(&tree), "AND[p]");
        assert_eq!(tree.root().operator, GroupOperator::And);

        let predicate = tree.predicates()[0];
        assert_eq!(predicate.attribute, "name");
        assert_eq!(predicate.predicate, Predicate::Is);
        assert_eq!(predicate.search_type, SearchType::PartialMatch);
        assert_eq!(predicate.value, "");
        assert_eq!(predicate.id, NodeId::new(1));
        assert_eq!(tree.root_id(), NodeId::new(2));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_default_tree_without_attributes() {
        let tree = FilterTree::new::<&str>(&[]);
        assert_eq!(tree.predicates()[0].attribute, "");
    }

    #[test]
    fn test_insert_sibling_with_same_operator() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let second = tree.insert_after(first, GroupOperator::And).unwrap();

        assert_eq!(shape(&tree), "AND[p,p]");
        assert_eq!(tree.root().children, vec![first, second]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_insert_places_new_predicate_right_after_target() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let last = tree.insert_after(first, GroupOperator::And).unwrap();
        let middle = tree.insert_after(first, GroupOperator::And).unwrap();

        assert_eq!(tree.root().children, vec![first, middle, last]);
    }

    #[test]
    fn test_insert_nests_with_different_operator() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let before = tree.depth_of(first).unwrap();

        let new_predicate = tree.insert_after(first, GroupOperator::Or).unwrap();

        assert_eq!(shape(&tree), "AND[OR[p,p]]");
        assert_eq!(tree.depth_of(first).unwrap(), before + 1);
        let wrapper = tree.parent_of(first).unwrap();
        assert_eq!(tree.parent_of(new_predicate), Some(wrapper));
        assert_eq!(tree.group(wrapper).unwrap().operator, GroupOperator::Or);
    }

    #[test]
    fn test_insert_on_root_group() {
        let mut tree = FilterTree::new(&["name"]);
        let root = tree.root_id();

        tree.insert_after(root, GroupOperator::And).unwrap();
        assert_eq!(shape(&tree), "AND[p,p]");
        assert_eq!(tree.root_id(), root);

        tree.insert_after(root, GroupOperator::Or).unwrap();
        assert_eq!(shape(&tree), "OR[AND[p,p],p]");
        assert_ne!(tree.root_id(), root);
    }

    #[test]
    fn test_new_ids_are_strictly_greater() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let max_before = tree.nodes.keys().max().copied().unwrap();

        let new_predicate = tree.insert_after(first, GroupOperator::Or).unwrap();
        assert!(new_predicate > max_before);
        let wrapper = tree.parent_of(first).unwrap();
        assert!(wrapper > new_predicate);
    }

    #[test]
    fn test_remove_sibling() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let second = tree.insert_after(first, GroupOperator::And).unwrap();

        tree.remove(first).unwrap();
        assert_eq!(shape(&tree), "AND[p]");
        assert_eq!(tree.root().children, vec![second]);
    }

    #[test]
    fn test_remove_collapses_two_child_group() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let second = tree.insert_after(first, GroupOperator::And).unwrap();
        let third = tree.insert_after(second, GroupOperator::Or).unwrap();
        assert_eq!(shape(&tree), "AND[p,OR[p,p]]");
        let wrapper = tree.parent_of(second).unwrap();

        tree.remove(third).unwrap();

        assert_eq!(shape(&tree), "AND[p,p]");
        assert_eq!(tree.root().children, vec![first, second]);
        assert!(tree.node(wrapper).is_none());
    }

    #[test]
    fn test_remove_group_removes_subtree() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let second = tree.insert_after(first, GroupOperator::And).unwrap();
        let third = tree.insert_after(second, GroupOperator::Or).unwrap();
        let wrapper = tree.parent_of(third).unwrap();

        tree.remove(wrapper).unwrap();

        assert_eq!(shape(&tree), "AND[p]");
        assert!(tree.node(second).is_none());
        assert!(tree.node(third).is_none());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_remove_last_predicate_resets() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        tree.update_field(first, FieldUpdate::Value("x".into())).unwrap();

        tree.remove(first).unwrap();

        assert_eq!(shape(&tree), "AND[p]");
        let fresh = tree.predicates()[0];
        assert_eq!(fresh.value, "");
        assert!(fresh.id > first);
    }

    #[test]
    fn test_remove_unknown_node_is_an_error() {
        let mut tree = FilterTree::new(&["name"]);
        let before = tree.clone();

        let err = tree.remove(NodeId::new(99)).unwrap_err();
        assert_eq!(err, TreeError::NodeNotFound(NodeId::new(99)));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_update_field() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);

        assert!(tree
            .update_field(first, FieldUpdate::Attribute("description".into()))
            .unwrap());
        assert!(tree
            .update_field(first, FieldUpdate::Predicate(Predicate::IsNot))
            .unwrap());
        assert!(tree
            .update_field(first, FieldUpdate::SearchType(SearchType::ExactMatch))
            .unwrap());
        assert!(tree
            .update_field(first, FieldUpdate::Value("abc".into()))
            .unwrap());

        let p = tree.predicate(first).unwrap();
        assert_eq!(p.attribute, "description");
        assert_eq!(p.predicate, Predicate::IsNot);
        assert_eq!(p.search_type, SearchType::ExactMatch);
        assert_eq!(p.value, "abc");
    }

    #[test]
    fn test_update_field_on_group_is_noop() {
        let mut tree = FilterTree::new(&["name"]);
        let before = tree.clone();
        let changed = tree
            .update_field(tree.root_id(), FieldUpdate::Value("x".into()))
            .unwrap();
        assert!(!changed);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_validate_rejects_singleton_group() {
        let mut tree = FilterTree::new(&["name"]);
        let first = first_predicate(&tree);
        let wrapper = tree.alloc_id();
        tree.insert_node(FilterNode::Group(GroupNode {
            id: wrapper,
            operator: GroupOperator::Or,
            children: vec![first],
        }));
        tree.group_mut(tree.root).children = vec![wrapper];

        assert_eq!(tree.validate(), Err(TreeError::SingletonGroup(wrapper)));
    }

    #[test]
    fn test_random_edit_sequences_keep_invariants() {
        // Small deterministic LCG so the sequence is reproducible.
        let mut seed: u64 = 0x5eed;
        let mut next = move |bound: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as usize) % bound
        };

        let mut tree = FilterTree::new(&["name"]);
        for _ in 0..500 {
            let ids: Vec<NodeId> = tree.nodes.keys().copied().collect();
            let target = ids[next(ids.len())];
            if next(3) == 0 {
                tree.remove(target).unwrap();
            } else {
                let operator = if next(2) == 0 {
                    GroupOperator::And
                } else {
                    GroupOperator::Or
                };
                tree.insert_after(target, operator).unwrap();
            }
            assert_eq!(tree.validate(), Ok(()));
        }
    }
}
