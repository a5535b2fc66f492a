// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph core for the `FlowGrid` editor.
//!
//! This crate provides the data model and connection engine behind the
//! editor surface:
//! - Typed input/output pins addressed by hashed application keys
//! - Link lifecycle: create, toggle off, re-wire, sever
//! - Dynamic per-cycle pins with mark-and-sweep pruning
//! - Pull-based value resolution through user compute functions
//!
//! ## Architecture
//!
//! Rendering, hit-testing, and input polling live outside this crate. The
//! core stores pin screen geometry and the hovered element on the renderer's
//! behalf, and receives connection gestures as plain [`Graph::connect`]
//! calls. One [`Graph`] instance backs one editor surface; everything is
//! single-threaded and driven by the host's update loop through
//! [`Graph::begin_cycle`] / [`Graph::end_cycle`].

pub mod pin;
pub mod link;
pub mod node;
pub mod graph;
pub mod evaluation;
pub mod registry;

pub use evaluation::{ComputeFn, EvalContext};
pub use graph::{ConnectOutcome, Graph, GraphError};
pub use link::{Hovered, Link};
pub use node::{Node, NodeId};
pub use pin::{ConnectionFilter, InPin, OutPin, Pin, PinKind, PinRef, PinUid, PinValue};
pub use registry::{NodeRegistry, NodeTemplate};

// Re-export the geometry types stored on nodes and pins.
pub use egui::{Pos2, Vec2};
