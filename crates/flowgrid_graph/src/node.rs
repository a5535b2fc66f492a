// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions: pin ownership and per-cycle dynamic-pin bookkeeping.

use crate::pin::{Pin, PinKind, PinRef, PinUid};
use egui::Pos2;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A dynamic pin together with its this-cycle presence flag.
struct DynPin {
    present: bool,
    pin: Box<dyn Pin>,
}

/// A node instance owning its pins.
///
/// Static pins are declared once and live as long as the node. Dynamic pins
/// are re-declared every cycle: a declaration refreshes the pin's presence
/// flag, and any pin left undeclared when the cycle ends is swept, links
/// first.
pub struct Node {
    id: NodeId,
    name: String,
    position: Pos2,
    ins: Vec<Box<dyn Pin>>,
    outs: Vec<Box<dyn Pin>>,
    dynamic_ins: Vec<DynPin>,
    dynamic_outs: Vec<DynPin>,
    selected: bool,
    selected_next: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: impl Into<String>, position: Pos2) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            ins: Vec::new(),
            outs: Vec::new(),
            dynamic_ins: Vec::new(),
            dynamic_outs: Vec::new(),
            selected: false,
            selected_next: false,
        }
    }

    /// Instance ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Position in graph coordinates.
    pub fn position(&self) -> Pos2 {
        self.position
    }

    /// Move the node.
    pub fn set_position(&mut self, position: Pos2) {
        self.position = position;
    }

    /// Committed selection state.
    pub fn selected(&self) -> bool {
        self.selected
    }

    /// Request a selection change; takes effect when the next cycle begins.
    pub fn set_selected(&mut self, state: bool) {
        self.selected_next = state;
    }

    pub(crate) fn commit_selection(&mut self) {
        self.selected = self.selected_next;
    }

    /// Find an input pin by uid, static pins first, then dynamic.
    pub fn input_pin(&self, uid: PinUid) -> Option<&dyn Pin> {
        self.ins
            .iter()
            .find(|p| p.uid() == uid)
            .map(|p| &**p)
            .or_else(|| {
                self.dynamic_ins
                    .iter()
                    .find(|d| d.pin.uid() == uid)
                    .map(|d| &*d.pin)
            })
    }

    /// Find an output pin by uid, static pins first, then dynamic.
    pub fn output_pin(&self, uid: PinUid) -> Option<&dyn Pin> {
        self.outs
            .iter()
            .find(|p| p.uid() == uid)
            .map(|p| &**p)
            .or_else(|| {
                self.dynamic_outs
                    .iter()
                    .find(|d| d.pin.uid() == uid)
                    .map(|d| &*d.pin)
            })
    }

    pub(crate) fn input_pin_mut(&mut self, uid: PinUid) -> Option<&mut dyn Pin> {
        if let Some(p) = self.ins.iter_mut().find(|p| p.uid() == uid) {
            return Some(&mut **p);
        }
        if let Some(d) = self.dynamic_ins.iter_mut().find(|d| d.pin.uid() == uid) {
            return Some(&mut *d.pin);
        }
        None
    }

    pub(crate) fn output_pin_mut(&mut self, uid: PinUid) -> Option<&mut dyn Pin> {
        if let Some(p) = self.outs.iter_mut().find(|p| p.uid() == uid) {
            return Some(&mut **p);
        }
        if let Some(d) = self.dynamic_outs.iter_mut().find(|d| d.pin.uid() == uid) {
            return Some(&mut *d.pin);
        }
        None
    }

    /// All input pins in declaration order, static then dynamic.
    pub fn input_pins(&self) -> impl Iterator<Item = &dyn Pin> {
        self.ins
            .iter()
            .map(|p| &**p)
            .chain(self.dynamic_ins.iter().map(|d| &*d.pin))
    }

    /// All output pins in declaration order, static then dynamic.
    pub fn output_pins(&self) -> impl Iterator<Item = &dyn Pin> {
        self.outs
            .iter()
            .map(|p| &**p)
            .chain(self.dynamic_outs.iter().map(|d| &*d.pin))
    }

    /// Address of an input pin, if it exists.
    pub fn input_ref(&self, uid: PinUid) -> Option<PinRef> {
        self.input_pin(uid).map(|p| PinRef {
            node: self.id,
            kind: PinKind::Input,
            uid: p.uid(),
        })
    }

    /// Address of an output pin, if it exists.
    pub fn output_ref(&self, uid: PinUid) -> Option<PinRef> {
        self.output_pin(uid).map(|p| PinRef {
            node: self.id,
            kind: PinKind::Output,
            uid: p.uid(),
        })
    }

    /// Number of pins, static and dynamic, both directions.
    pub fn pin_count(&self) -> usize {
        self.ins.len() + self.outs.len() + self.dynamic_ins.len() + self.dynamic_outs.len()
    }

    pub(crate) fn push_static(&mut self, pin: Box<dyn Pin>) {
        let taken = match pin.kind() {
            PinKind::Input => self.input_pin(pin.uid()).is_some(),
            PinKind::Output => self.output_pin(pin.uid()).is_some(),
        };
        debug_assert!(!taken, "pin key collides with an existing pin on this node");
        match pin.kind() {
            PinKind::Input => self.ins.push(pin),
            PinKind::Output => self.outs.push(pin),
        }
    }

    /// Refresh presence for an existing dynamic pin; false when absent.
    pub(crate) fn refresh_dynamic(&mut self, kind: PinKind, uid: PinUid) -> bool {
        let pins = match kind {
            PinKind::Input => &mut self.dynamic_ins,
            PinKind::Output => &mut self.dynamic_outs,
        };
        match pins.iter_mut().find(|d| d.pin.uid() == uid) {
            Some(d) => {
                d.present = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn push_dynamic(&mut self, pin: Box<dyn Pin>) {
        let statics = match pin.kind() {
            PinKind::Input => &self.ins,
            PinKind::Output => &self.outs,
        };
        debug_assert!(
            statics.iter().all(|p| p.uid() != pin.uid()),
            "dynamic pin key collides with a static pin on this node"
        );
        let entry = DynPin { present: true, pin };
        match entry.pin.kind() {
            PinKind::Input => self.dynamic_ins.push(entry),
            PinKind::Output => self.dynamic_outs.push(entry),
        }
    }

    /// Flag every dynamic pin absent ahead of this cycle's declarations.
    pub(crate) fn reset_dynamic_presence(&mut self) {
        for d in self.dynamic_ins.iter_mut().chain(self.dynamic_outs.iter_mut()) {
            d.present = false;
        }
    }

    /// Addresses of dynamic pins that were not declared this cycle.
    pub(crate) fn stale_dynamic_pins(&self) -> Vec<PinRef> {
        let ins = self.dynamic_ins.iter().filter(|d| !d.present).map(|d| PinRef {
            node: self.id,
            kind: PinKind::Input,
            uid: d.pin.uid(),
        });
        let outs = self.dynamic_outs.iter().filter(|d| !d.present).map(|d| PinRef {
            node: self.id,
            kind: PinKind::Output,
            uid: d.pin.uid(),
        });
        ins.chain(outs).collect()
    }

    /// Drop every dynamic pin still flagged absent.
    pub(crate) fn prune_dynamic(&mut self) {
        self.dynamic_ins.retain(|d| d.present);
        self.dynamic_outs.retain(|d| d.present);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inputs", &(self.ins.len() + self.dynamic_ins.len()))
            .field("outputs", &(self.outs.len() + self.dynamic_outs.len()))
            .finish_non_exhaustive()
    }
}
