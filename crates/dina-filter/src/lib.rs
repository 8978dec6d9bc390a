//! DINA filter expressions
//!
//! This crate provides the editable filter tree behind list-page search forms
//! and the compiler that turns it into an RSQL `filter[rsql]` string.
//!
//! # Filter trees
//!
//! A tree always has a group at its root. Predicates compare one attribute
//! with a value; groups join their children with AND or OR.
//!
//! ```text
//! AND
//! ├── OR
//! │   ├── name IS 101F
//! │   └── group.groupName IS poffm
//! └── name IS_NOT 1075R
//! ```
//!
//! compiles to
//!
//! ```text
//! (name==101F,group.groupName==poffm);name!=1075R
//! ```
//!
//! # Usage
//!
//! ```rust
//! use dina_filter::{FieldUpdate, FilterTree, GroupOperator, RsqlCompiler, SearchType};
//!
//! let mut tree = FilterTree::new(&["name", "group.groupName"]);
//! let first = tree.predicates()[0].id;
//! tree.update_field(first, FieldUpdate::Value("101F".into())).unwrap();
//! tree.update_field(first, FieldUpdate::SearchType(SearchType::ExactMatch)).unwrap();
//!
//! let second = tree.insert_after(first, GroupOperator::Or).unwrap();
//! tree.update_field(second, FieldUpdate::Attribute("group.groupName".into())).unwrap();
//! tree.update_field(second, FieldUpdate::SearchType(SearchType::ExactMatch)).unwrap();
//! tree.update_field(second, FieldUpdate::Value("poffm".into())).unwrap();
//!
//! let rsql = RsqlCompiler::default().compile(Some(&tree));
//! assert_eq!(rsql, "name==101F,group.groupName==poffm");
//! ```

pub mod attribute;
pub mod builder;
pub mod compiler;
pub mod error;
pub mod model;
pub mod rsql;
pub mod tree;

pub use attribute::{AttributeKind, FilterAttribute};
pub use builder::FilterBuilder;
pub use compiler::{compile, RsqlCompiler};
pub use error::TreeError;
pub use model::FilterModel;
pub use rsql::{quote_argument, Arguments, Comparison, RsqlExpr};
pub use tree::{
    FieldUpdate, FilterNode, FilterTree, GroupNode, GroupOperator, NodeId, Predicate,
    PredicateNode, SearchType,
};

/// Compile a nested filter value to RSQL in one step.
///
/// # Example
///
/// ```rust
/// use dina_filter::{compile_model, FilterModel, GroupOperator, Predicate, SearchType};
///
/// let model = FilterModel::group(
///     GroupOperator::And,
///     vec![FilterModel::row("name", Predicate::Is, SearchType::PartialMatch, "101F")],
/// );
/// assert_eq!(compile_model(&model, &[]), "name==*101F*");
/// ```
pub fn compile_model(model: &FilterModel, attributes: &[FilterAttribute]) -> String {
    let default_attribute = attributes
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_default();
    let tree = FilterTree::from_model(model, default_attribute);
    RsqlCompiler::new(attributes.to_vec()).compile(Some(&tree))
}
