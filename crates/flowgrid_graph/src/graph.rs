// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph root: node ownership, link lifecycle, and pull value resolution.

use crate::evaluation::EvalContext;
use crate::link::{Hovered, Link};
use crate::node::{Node, NodeId};
use crate::pin::{ConnectionFilter, InPin, OutPin, Pin, PinKind, PinRef, PinUid, PinValue};
use egui::{Pos2, Vec2};
use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

static INSTANCES: AtomicUsize = AtomicUsize::new(0);

/// Error raised by graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node not found.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// No pin with the requested key on the node.
    #[error("no pin with uid {uid:?} on node {node:?}")]
    KeyNotFound {
        /// Node that was searched.
        node: NodeId,
        /// Uid derived from the requested key.
        uid: PinUid,
    },

    /// Pins carry different value types.
    #[error("value type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type requested, or required by the input side.
        expected: &'static str,
        /// Type actually carried by the pin.
        found: &'static str,
    },

    /// Pin filters share no capability bit.
    #[error("pin filters share no capability")]
    IncompatibleFilter,

    /// Same pin, or same node without the same-node capability.
    #[error("pin cannot connect to itself or within its own node")]
    SelfConnection,

    /// Two inputs, or two outputs.
    #[error("a link needs exactly one input and one output pin")]
    InvalidDirection,
}

/// What a connection attempt did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new link now joins the two pins.
    Connected,
    /// The pins were joined by exactly this link already; it was removed.
    Disconnected,
}

/// A node graph: single owner of its nodes and registry of their links.
///
/// All mutation and all value reads happen synchronously on the thread that
/// owns the graph; one instance backs one editor surface.
pub struct Graph {
    name: String,
    nodes: IndexMap<NodeId, Node>,
    links: Vec<Link>,
    hovered: Option<Hovered>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: Vec::new(),
            hovered: None,
        }
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a node, returning its id for later lookups.
    pub fn add_node(&mut self, name: impl Into<String>, position: Pos2) -> NodeId {
        let id = NodeId::new();
        let node = Node::new(id, name, position);
        debug!(node = ?id, name = node.name(), "node added");
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node, severing every link touching any of its pins first.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        if !self.nodes.contains_key(&node_id) {
            return None;
        }
        let incident: Vec<Link> = self
            .links
            .iter()
            .copied()
            .filter(|l| l.involves_node(node_id))
            .collect();
        for link in incident {
            self.sever(link);
        }
        debug!(node = ?node_id, "node removed");
        self.nodes.shift_remove(&node_id)
    }

    /// Remove the first node with the given display name.
    pub fn remove_node_named(&mut self, name: &str) -> Option<Node> {
        let id = self.nodes.values().find(|n| n.name() == name).map(Node::id)?;
        self.remove_node(id)
    }

    /// Remove every node whose committed selection state is set.
    pub fn remove_selected_nodes(&mut self) -> usize {
        let selected: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.selected())
            .map(Node::id)
            .collect();
        let count = selected.len();
        for id in selected {
            self.remove_node(id);
        }
        count
    }

    /// Get a node by ID.
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Declare a static input pin on a node.
    ///
    /// `default` is the value reads yield while the pin is unlinked.
    pub fn add_input<T: PinValue>(
        &mut self,
        node_id: NodeId,
        key: impl Into<PinUid>,
        name: &str,
        default: T,
        filter: ConnectionFilter,
    ) -> Result<PinRef, GraphError> {
        let uid = key.into();
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.push_static(Box::new(InPin::new(uid, name, default, filter)));
        Ok(PinRef {
            node: node_id,
            kind: PinKind::Input,
            uid,
        })
    }

    /// Declare a static output pin on a node, holding `initial` until a
    /// compute function or an explicit value replaces it.
    pub fn add_output<T: PinValue>(
        &mut self,
        node_id: NodeId,
        key: impl Into<PinUid>,
        name: &str,
        initial: T,
        filter: ConnectionFilter,
    ) -> Result<PinRef, GraphError> {
        let uid = key.into();
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.push_static(Box::new(OutPin::new(uid, name, initial, filter)));
        Ok(PinRef {
            node: node_id,
            kind: PinKind::Output,
            uid,
        })
    }

    /// Install the compute function of an output pin.
    pub fn set_compute<T: PinValue>(
        &mut self,
        node_id: NodeId,
        key: impl Into<PinUid>,
        compute: impl Fn(&EvalContext<'_>) -> T + 'static,
    ) -> Result<(), GraphError> {
        self.typed_output_mut::<T>(node_id, key.into())?
            .set_compute(compute);
        Ok(())
    }

    /// Overwrite the stored value of an output pin.
    pub fn set_output_value<T: PinValue>(
        &mut self,
        node_id: NodeId,
        key: impl Into<PinUid>,
        value: T,
    ) -> Result<(), GraphError> {
        self.typed_output_mut::<T>(node_id, key.into())?.set_value(value);
        Ok(())
    }

    /// Address of an input pin.
    pub fn input_ref(
        &self,
        node_id: NodeId,
        key: impl Into<PinUid>,
    ) -> Result<PinRef, GraphError> {
        let uid = key.into();
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.input_ref(uid)
            .ok_or(GraphError::KeyNotFound { node: node_id, uid })
    }

    /// Address of an output pin.
    pub fn output_ref(
        &self,
        node_id: NodeId,
        key: impl Into<PinUid>,
    ) -> Result<PinRef, GraphError> {
        let uid = key.into();
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.output_ref(uid)
            .ok_or(GraphError::KeyNotFound { node: node_id, uid })
    }

    /// Look a pin up by address.
    pub fn pin(&self, pin: PinRef) -> Option<&dyn Pin> {
        let node = self.nodes.get(&pin.node)?;
        match pin.kind {
            PinKind::Input => node.input_pin(pin.uid),
            PinKind::Output => node.output_pin(pin.uid),
        }
    }

    /// Store a pin's screen position and hit-box size after layout.
    pub fn set_pin_bounds(
        &mut self,
        pin: PinRef,
        position: Pos2,
        size: Vec2,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&pin.node)
            .ok_or(GraphError::NodeNotFound(pin.node))?;
        let target = match pin.kind {
            PinKind::Input => node.input_pin_mut(pin.uid),
            PinKind::Output => node.output_pin_mut(pin.uid),
        }
        .ok_or(GraphError::KeyNotFound {
            node: pin.node,
            uid: pin.uid,
        })?;
        target.set_position(position);
        target.set_size(size);
        Ok(())
    }

    /// Element under the pointer, as last written by the rendering layer.
    pub fn hovered(&self) -> Option<Hovered> {
        self.hovered
    }

    /// Record the element under the pointer.
    pub fn set_hovered(&mut self, hovered: Option<Hovered>) {
        self.hovered = hovered;
    }

    /// All live links.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Number of live links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Attempt a connection between two pins, in either argument order.
    ///
    /// A repeat of an existing link toggles it off (click-to-disconnect); an
    /// input that already had a different source is re-wired. A rejected
    /// attempt leaves the graph untouched.
    pub fn connect(&mut self, a: PinRef, b: PinRef) -> Result<ConnectOutcome, GraphError> {
        if a == b {
            return Err(GraphError::SelfConnection);
        }
        let (source, target) = match (a.kind, b.kind) {
            (PinKind::Output, PinKind::Input) => (a, b),
            (PinKind::Input, PinKind::Output) => (b, a),
            _ => return Err(GraphError::InvalidDirection),
        };
        let (out_filter, out_type, out_type_name) = {
            let pin = self.resolve_pin(source)?;
            (pin.filter(), pin.value_type(), pin.value_type_name())
        };
        let (in_filter, in_type, in_type_name, existing) = {
            let pin = self.resolve_pin(target)?;
            (pin.filter(), pin.value_type(), pin.value_type_name(), pin.link())
        };
        if source.node == target.node && !in_filter.contains(ConnectionFilter::SAME_NODE) {
            return Err(GraphError::SelfConnection);
        }
        if !in_filter.admits(out_filter) {
            return Err(GraphError::IncompatibleFilter);
        }
        if in_type != out_type {
            return Err(GraphError::TypeMismatch {
                expected: in_type_name,
                found: out_type_name,
            });
        }
        if let Some(link) = existing {
            if link.source == source {
                self.sever(link);
                debug!(?link, "link toggled off");
                return Ok(ConnectOutcome::Disconnected);
            }
            self.sever(link);
        }
        let link = Link::new(source, target);
        if let Some(node) = self.nodes.get_mut(&target.node) {
            if let Some(pin) = node.input_pin_mut(target.uid) {
                pin.set_link(link);
            }
        }
        if let Some(node) = self.nodes.get_mut(&source.node) {
            if let Some(pin) = node.output_pin_mut(source.uid) {
                pin.record_feed(target);
            }
        }
        self.links.push(link);
        debug!(?link, "link created");
        Ok(ConnectOutcome::Connected)
    }

    /// Drop the link held by an input pin. Returns true when a link existed.
    pub fn disconnect(&mut self, target: PinRef) -> Result<bool, GraphError> {
        if target.kind != PinKind::Input {
            return Err(GraphError::InvalidDirection);
        }
        match self.resolve_pin(target)?.link() {
            Some(link) => {
                self.sever(link);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Start an update cycle: commit deferred selection, clear hover state,
    /// and flag every dynamic pin absent ahead of this cycle's declarations.
    pub fn begin_cycle(&mut self) {
        self.hovered = None;
        for node in self.nodes.values_mut() {
            node.commit_selection();
            node.reset_dynamic_presence();
        }
    }

    /// Declare (or refresh) a dynamic input pin and read its current value.
    ///
    /// An existing pin with the same key keeps its state and link; only its
    /// presence flag is refreshed.
    pub fn show_input<T: PinValue>(
        &mut self,
        node_id: NodeId,
        key: impl Into<PinUid>,
        name: &str,
        default: T,
        filter: ConnectionFilter,
    ) -> Result<T, GraphError> {
        let uid = key.into();
        {
            let node = self
                .nodes
                .get_mut(&node_id)
                .ok_or(GraphError::NodeNotFound(node_id))?;
            if !node.refresh_dynamic(PinKind::Input, uid) {
                node.push_dynamic(Box::new(InPin::new(uid, name, default, filter)));
            }
        }
        self.input_value(node_id, uid)
    }

    /// Declare (or refresh) a dynamic output pin.
    ///
    /// The compute function is installed when the pin is first declared;
    /// re-declarations refresh presence and keep the original behaviour.
    pub fn show_output<T: PinValue + Default>(
        &mut self,
        node_id: NodeId,
        key: impl Into<PinUid>,
        name: &str,
        filter: ConnectionFilter,
        compute: impl Fn(&EvalContext<'_>) -> T + 'static,
    ) -> Result<(), GraphError> {
        let uid = key.into();
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        if !node.refresh_dynamic(PinKind::Output, uid) {
            let mut pin = OutPin::new(uid, name, T::default(), filter);
            pin.set_compute(compute);
            node.push_dynamic(Box::new(pin));
        }
        Ok(())
    }

    /// Finish an update cycle: remove every dynamic pin left undeclared
    /// since [`Graph::begin_cycle`], severing its links first.
    pub fn end_cycle(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            let stale = match self.nodes.get(&id) {
                Some(node) => node.stale_dynamic_pins(),
                None => continue,
            };
            for pin in stale {
                trace!(?pin, "pruning undeclared dynamic pin");
                let incident: Vec<Link> = self
                    .links
                    .iter()
                    .copied()
                    .filter(|l| l.involves_pin(pin))
                    .collect();
                for link in incident {
                    self.sever(link);
                }
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.prune_dynamic();
            }
        }
    }

    /// Read an input pin: its default while unlinked, otherwise the value of
    /// the output at the far end of its link, recomputed on every read.
    pub fn input_value<T: PinValue>(
        &self,
        node_id: NodeId,
        key: impl Into<PinUid>,
    ) -> Result<T, GraphError> {
        let uid = key.into();
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let pin = node
            .input_pin(uid)
            .ok_or(GraphError::KeyNotFound { node: node_id, uid })?;
        let found = pin.value_type_name();
        let pin = pin
            .as_any()
            .downcast_ref::<InPin<T>>()
            .ok_or(GraphError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })?;
        match pin.link() {
            Some(link) => self.pull_output(link.source),
            None => Ok(pin.default_value().clone()),
        }
    }

    /// Read an output pin, re-running its compute function when present.
    pub fn output_value<T: PinValue>(
        &self,
        node_id: NodeId,
        key: impl Into<PinUid>,
    ) -> Result<T, GraphError> {
        self.pull_output(PinRef {
            node: node_id,
            kind: PinKind::Output,
            uid: key.into(),
        })
    }

    fn pull_output<T: PinValue>(&self, source: PinRef) -> Result<T, GraphError> {
        let node = self
            .nodes
            .get(&source.node)
            .ok_or(GraphError::NodeNotFound(source.node))?;
        let pin = node.output_pin(source.uid).ok_or(GraphError::KeyNotFound {
            node: source.node,
            uid: source.uid,
        })?;
        let found = pin.value_type_name();
        let pin = pin
            .as_any()
            .downcast_ref::<OutPin<T>>()
            .ok_or(GraphError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })?;
        Ok(pin.resolve(self, source.node))
    }

    fn resolve_pin(&self, pin: PinRef) -> Result<&dyn Pin, GraphError> {
        let node = self
            .nodes
            .get(&pin.node)
            .ok_or(GraphError::NodeNotFound(pin.node))?;
        let found = match pin.kind {
            PinKind::Input => node.input_pin(pin.uid),
            PinKind::Output => node.output_pin(pin.uid),
        };
        found.ok_or(GraphError::KeyNotFound {
            node: pin.node,
            uid: pin.uid,
        })
    }

    fn typed_output_mut<T: PinValue>(
        &mut self,
        node_id: NodeId,
        uid: PinUid,
    ) -> Result<&mut OutPin<T>, GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let pin = node
            .output_pin_mut(uid)
            .ok_or(GraphError::KeyNotFound { node: node_id, uid })?;
        let found = pin.value_type_name();
        pin.as_any_mut()
            .downcast_mut::<OutPin<T>>()
            .ok_or(GraphError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })
    }

    fn sever(&mut self, link: Link) {
        if let Some(node) = self.nodes.get_mut(&link.target.node) {
            if let Some(pin) = node.input_pin_mut(link.target.uid) {
                if pin.link() == Some(link) {
                    pin.clear_link();
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&link.source.node) {
            if let Some(pin) = node.output_pin_mut(link.source.uid) {
                pin.remove_feed(link.target);
            }
        }
        self.links.retain(|l| *l != link);
    }
}

impl Default for Graph {
    fn default() -> Self {
        let n = INSTANCES.fetch_add(1, Ordering::Relaxed);
        Self::new(format!("flowgrid-{n}"))
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .finish_non_exhaustive()
    }
}
