// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pull evaluation: the context handed to output compute functions.

use crate::graph::{Graph, GraphError};
use crate::node::NodeId;
use crate::pin::{PinUid, PinValue};

/// Function producing an output pin's value, re-run on every read.
pub type ComputeFn<T> = Box<dyn Fn(&EvalContext<'_>) -> T>;

/// Read access handed to a compute function while its output is resolved.
///
/// Reading an input pulls the output at the far end of its link, so a read
/// recurses as far up the graph as links reach.
pub struct EvalContext<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The node owning the output being resolved.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The graph being evaluated.
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// Read one of the owning node's input pins.
    pub fn input<T: PinValue>(&self, key: impl Into<PinUid>) -> Result<T, GraphError> {
        self.graph.input_value(self.node, key)
    }
}
