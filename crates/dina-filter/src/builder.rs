//! Filter tree bound to a form field.

use std::fmt;

use tracing::debug;

use crate::attribute::FilterAttribute;
use crate::compiler::RsqlCompiler;
use crate::error::TreeError;
use crate::model::FilterModel;
use crate::tree::{FieldUpdate, FilterTree, GroupOperator, NodeId};

type ChangeListener = Box<dyn FnMut(&FilterTree) + Send>;

/// Owns the filter tree edited by a list page's filter form.
///
/// Every successful mutation is reported to the change listener, if one is
/// set. Compilation happens only when [`FilterBuilder::compile`] is called.
pub struct FilterBuilder {
    attributes: Vec<FilterAttribute>,
    compiler: RsqlCompiler,
    tree: FilterTree,
    on_change: Option<ChangeListener>,
}

impl FilterBuilder {
    /// Create a builder holding the default tree for `attributes`.
    pub fn new(attributes: Vec<FilterAttribute>) -> Self {
        let tree = FilterTree::new(&attributes);
        let compiler = RsqlCompiler::new(attributes.clone());
        Self {
            attributes,
            compiler,
            tree,
            on_change: None,
        }
    }

    /// Use `compiler` instead of one built from the attribute list.
    pub fn with_compiler(mut self, compiler: RsqlCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Register a listener called after every mutation.
    pub fn on_change(mut self, listener: impl FnMut(&FilterTree) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(listener));
        self
    }

    pub fn attributes(&self) -> &[FilterAttribute] {
        &self.attributes
    }

    pub fn tree(&self) -> &FilterTree {
        &self.tree
    }

    /// Add a blank predicate after `target`. See [`FilterTree::insert_after`].
    pub fn add_after(
        &mut self,
        target: NodeId,
        operator: GroupOperator,
    ) -> Result<NodeId, TreeError> {
        let id = self.tree.insert_after(target, operator)?;
        self.changed();
        Ok(id)
    }

    /// Remove a node. See [`FilterTree::remove`].
    pub fn remove(&mut self, target: NodeId) -> Result<(), TreeError> {
        self.tree.remove(target)?;
        self.changed();
        Ok(())
    }

    /// Change one field of a predicate. Group targets are left alone and do
    /// not notify the listener.
    pub fn update(&mut self, target: NodeId, update: FieldUpdate) -> Result<(), TreeError> {
        if self.tree.update_field(target, update)? {
            self.changed();
        }
        Ok(())
    }

    /// Replace the bound value. `None` resets to the default tree.
    pub fn set_value(&mut self, value: Option<&FilterModel>) {
        let default_attribute = self.tree.default_attribute().to_string();
        match value {
            Some(model) => self.tree = FilterTree::from_model(model, default_attribute),
            None => {
                debug!("filter value cleared, resetting tree");
                self.tree.reset();
            }
        }
        self.changed();
    }

    /// The bound value in nested form.
    pub fn value(&self) -> FilterModel {
        self.tree.to_model()
    }

    /// Compile the current tree to RSQL.
    pub fn compile(&self) -> String {
        self.compiler.compile(Some(&self.tree))
    }

    fn changed(&mut self) {
        if let Some(listener) = self.on_change.as_mut() {
            listener(&self.tree);
        }
    }
}

impl fmt::Debug for FilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBuilder")
            .field("attributes", &self.attributes)
            .field("tree", &self.tree)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
