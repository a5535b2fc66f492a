// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of reusable node templates.

use crate::graph::Graph;
use crate::node::NodeId;
use egui::Pos2;
use indexmap::IndexMap;
use std::fmt;

/// Blueprint for a node kind: a display name plus a builder that declares
/// pins and behaviour on a freshly added node.
pub struct NodeTemplate {
    id: String,
    name: String,
    build: Box<dyn Fn(&mut Graph, NodeId)>,
}

impl NodeTemplate {
    /// Define a template under a unique id.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        build: impl Fn(&mut Graph, NodeId) + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            build: Box::new(build),
        }
    }

    /// Template id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name given to instantiated nodes.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTemplate")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of available node templates.
#[derive(Default)]
pub struct NodeRegistry {
    templates: IndexMap<String, NodeTemplate>,
}

impl NodeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            templates: IndexMap::new(),
        }
    }

    /// Register a template, replacing any previous one with the same id.
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Get a template by id.
    pub fn get(&self, id: &str) -> Option<&NodeTemplate> {
        self.templates.get(id)
    }

    /// All registered templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values()
    }

    /// Add a node built from the template with the given id.
    pub fn instantiate(&self, graph: &mut Graph, id: &str, position: Pos2) -> Option<NodeId> {
        let template = self.get(id)?;
        let node = graph.add_node(template.name.clone(), position);
        (template.build)(graph, node);
        Some(node)
    }
}
