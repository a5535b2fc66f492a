// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (edge) definitions for the graph.

use crate::node::NodeId;
use crate::pin::PinRef;

/// A directed edge from one output pin to one input pin.
///
/// The authoritative copy lives in the owning input pin's slot; the graph's
/// global registry and the source pin's feed list only observe it and are
/// kept consistent at every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    /// Output pin feeding the link.
    pub source: PinRef,
    /// Input pin owning the link.
    pub target: PinRef,
}

impl Link {
    /// Create a link between a source output and a target input.
    pub fn new(source: PinRef, target: PinRef) -> Self {
        Self { source, target }
    }

    /// Check if this link touches a specific node.
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.source.node == node_id || self.target.node == node_id
    }

    /// Check if this link touches a specific pin.
    pub fn involves_pin(&self, pin: PinRef) -> bool {
        self.source == pin || self.target == pin
    }
}

/// Element currently under the pointer, written back by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hovered {
    /// A pin is hovered.
    Pin(PinRef),
    /// A link is hovered.
    Link(Link),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{PinKind, PinUid};

    #[test]
    fn involvement_checks_both_ends() {
        let a = NodeId::new();
        let b = NodeId::new();
        let source = PinRef {
            node: a,
            kind: PinKind::Output,
            uid: PinUid::of("out"),
        };
        let target = PinRef {
            node: b,
            kind: PinKind::Input,
            uid: PinUid::of("in"),
        };
        let link = Link::new(source, target);
        assert!(link.involves_node(a));
        assert!(link.involves_node(b));
        assert!(!link.involves_node(NodeId::new()));
        assert!(link.involves_pin(source));
        assert!(link.involves_pin(target));
    }
}
