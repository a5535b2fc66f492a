// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin identity, connection filters, and the typed input/output pins.

use crate::evaluation::{ComputeFn, EvalContext};
use crate::graph::Graph;
use crate::link::Link;
use crate::node::NodeId;
use egui::{Pos2, Vec2};
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Identifier of a pin, unique within one direction of one node.
///
/// Reduced from an application-supplied key (string or integral) with a
/// deterministic hash: the same key always yields the same uid within the
/// process. Collisions are only probabilistically absent; static pin
/// declaration asserts uniqueness in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinUid(u64);

impl PinUid {
    /// Reduce an application key to a pin uid.
    pub fn of(key: impl Hash) -> Self {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl From<&str> for PinUid {
    fn from(key: &str) -> Self {
        Self::of(key)
    }
}

impl From<String> for PinUid {
    fn from(key: String) -> Self {
        Self::of(key)
    }
}

impl From<u64> for PinUid {
    fn from(key: u64) -> Self {
        Self::of(key)
    }
}

impl From<i64> for PinUid {
    fn from(key: i64) -> Self {
        Self::of(key)
    }
}

/// Whether a pin accepts or produces values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    /// Accepts a value over at most one link.
    Input,
    /// Produces a value for any number of links.
    Output,
}

/// Graph-wide address of a pin.
///
/// Input and output uid namespaces are independent within a node, so the
/// address carries the pin kind alongside the owning node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinRef {
    /// Owning node.
    pub node: NodeId,
    /// Namespace the uid lives in.
    pub kind: PinKind,
    /// Pin uid within that namespace.
    pub uid: PinUid,
}

bitflags::bitflags! {
    /// Coarse compatibility tag gating which input/output pairs may connect.
    ///
    /// Two pins are filter-compatible when their masks share at least one
    /// bit, or when either mask is empty (accept-all). This is a tagging
    /// system, not a type check; value types are enforced separately.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConnectionFilter: u64 {
        /// Permits a link between two pins of the same node.
        const SAME_NODE = 1 << 1;
        /// Integer-flavoured pins.
        const INT = 1 << 2;
        /// Single-precision float pins.
        const FLOAT = 1 << 3;
        /// Double-precision float pins.
        const DOUBLE = 1 << 4;
        /// String pins.
        const STRING = 1 << 5;
        /// Any numeric flavour.
        const NUMBERS = Self::INT.bits() | Self::FLOAT.bits() | Self::DOUBLE.bits();
    }
}

impl ConnectionFilter {
    /// Application-defined filter bit `n` (0-based), above the built-in bits.
    pub const fn custom(n: u32) -> Self {
        Self::from_bits_retain(1 << (6 + n))
    }

    /// True when the masks share a bit or either side accepts everything.
    pub fn admits(self, other: Self) -> bool {
        self.is_empty() || other.is_empty() || self.intersects(other)
    }
}

/// Marker for types that can flow through pins.
///
/// Blanket-implemented: hosts can route any `Clone + 'static` type.
pub trait PinValue: Clone + 'static {}

impl<T: Clone + 'static> PinValue for T {}

/// Object-safe surface shared by every pin.
///
/// Uid, kind, and owning node never change after construction. The link
/// bookkeeping methods are maintained by the [`Graph`]; the input side holds
/// the single owned link slot, the output side a list of non-owning feed
/// back-references.
pub trait Pin {
    /// Pin uid within its node and direction.
    fn uid(&self) -> PinUid;
    /// Display name.
    fn name(&self) -> &str;
    /// Input or output.
    fn kind(&self) -> PinKind;
    /// Connection filter mask.
    fn filter(&self) -> ConnectionFilter;
    /// Type tag of the values this pin carries.
    fn value_type(&self) -> TypeId;
    /// Name of the value type, for diagnostics.
    fn value_type_name(&self) -> &'static str;
    /// Screen position, as last written back by the layout pass.
    fn position(&self) -> Pos2;
    /// Store the screen position computed by layout.
    fn set_position(&mut self, position: Pos2);
    /// Hit-box size, as last written back by the layout pass.
    fn size(&self) -> Vec2;
    /// Store the hit-box size computed by layout.
    fn set_size(&mut self, size: Vec2);
    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Link currently owned by an input pin.
    fn link(&self) -> Option<Link> {
        None
    }
    /// Hand an input pin ownership of a link.
    fn set_link(&mut self, _link: Link) {}
    /// Drop an input pin's link.
    fn clear_link(&mut self) {}
    /// Inputs currently fed by an output pin.
    fn feeds(&self) -> &[PinRef] {
        &[]
    }
    /// Record a new target on an output pin.
    fn record_feed(&mut self, _target: PinRef) {}
    /// Forget a target on an output pin.
    fn remove_feed(&mut self, _target: PinRef) {}
}

#[derive(Debug, Clone)]
struct PinMeta {
    uid: PinUid,
    name: String,
    filter: ConnectionFilter,
    position: Pos2,
    size: Vec2,
}

impl PinMeta {
    fn new(uid: PinUid, name: &str, filter: ConnectionFilter) -> Self {
        Self {
            uid,
            name: name.to_owned(),
            filter,
            position: Pos2::ZERO,
            size: Vec2::ZERO,
        }
    }
}

/// Input pin: owns at most one link and yields a default while unlinked.
pub struct InPin<T> {
    meta: PinMeta,
    default: T,
    link: Option<Link>,
}

impl<T: PinValue> InPin<T> {
    /// Build an input pin with the value returned while unlinked.
    pub fn new(uid: PinUid, name: &str, default: T, filter: ConnectionFilter) -> Self {
        Self {
            meta: PinMeta::new(uid, name, filter),
            default,
            link: None,
        }
    }

    /// Value returned while the pin is unlinked.
    pub fn default_value(&self) -> &T {
        &self.default
    }
}

impl<T: PinValue> Pin for InPin<T> {
    fn uid(&self) -> PinUid {
        self.meta.uid
    }

    fn name(&self) -> &str {
        &self.meta.name
    }

    fn kind(&self) -> PinKind {
        PinKind::Input
    }

    fn filter(&self) -> ConnectionFilter {
        self.meta.filter
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn position(&self) -> Pos2 {
        self.meta.position
    }

    fn set_position(&mut self, position: Pos2) {
        self.meta.position = position;
    }

    fn size(&self) -> Vec2 {
        self.meta.size
    }

    fn set_size(&mut self, size: Vec2) {
        self.meta.size = size;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn link(&self) -> Option<Link> {
        self.link
    }

    fn set_link(&mut self, link: Link) {
        self.link = Some(link);
    }

    fn clear_link(&mut self) {
        self.link = None;
    }
}

/// Output pin: computes or stores a value and fans out to many inputs.
///
/// The compute function, when installed, runs on every read and refreshes
/// the cached value; there is no per-cycle memoization, so shared upstream
/// outputs are recomputed once per downstream read. A re-entrant read (a
/// cycle wired through same-node links) returns the cached value instead of
/// recursing.
pub struct OutPin<T> {
    meta: PinMeta,
    value: RefCell<T>,
    compute: Option<ComputeFn<T>>,
    feeds: Vec<PinRef>,
    resolving: Cell<bool>,
}

impl<T: PinValue> OutPin<T> {
    /// Build an output pin holding `initial` until computed or set.
    pub fn new(uid: PinUid, name: &str, initial: T, filter: ConnectionFilter) -> Self {
        Self {
            meta: PinMeta::new(uid, name, filter),
            value: RefCell::new(initial),
            compute: None,
            feeds: Vec::new(),
            resolving: Cell::new(false),
        }
    }

    /// Install the function producing this pin's value.
    pub fn set_compute(&mut self, compute: impl Fn(&EvalContext<'_>) -> T + 'static) {
        self.compute = Some(Box::new(compute));
    }

    /// Overwrite the stored value directly.
    pub fn set_value(&mut self, value: T) {
        *self.value.get_mut() = value;
    }

    /// Last computed (or set) value, without running the compute function.
    pub fn last_value(&self) -> T {
        self.value.borrow().clone()
    }

    /// Produce the pin's current value.
    ///
    /// Runs the compute function when one is installed and stores the result
    /// for introspection; otherwise hands back the stored value as-is.
    pub(crate) fn resolve(&self, graph: &Graph, node: NodeId) -> T {
        let Some(compute) = &self.compute else {
            return self.value.borrow().clone();
        };
        if self.resolving.replace(true) {
            return self.value.borrow().clone();
        }
        let _reset = ResolveGuard(&self.resolving);
        let value = compute(&EvalContext::new(graph, node));
        *self.value.borrow_mut() = value.clone();
        value
    }
}

struct ResolveGuard<'a>(&'a Cell<bool>);

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: PinValue> Pin for OutPin<T> {
    fn uid(&self) -> PinUid {
        self.meta.uid
    }

    fn name(&self) -> &str {
        &self.meta.name
    }

    fn kind(&self) -> PinKind {
        PinKind::Output
    }

    fn filter(&self) -> ConnectionFilter {
        self.meta.filter
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn position(&self) -> Pos2 {
        self.meta.position
    }

    fn set_position(&mut self, position: Pos2) {
        self.meta.position = position;
    }

    fn size(&self) -> Vec2 {
        self.meta.size
    }

    fn set_size(&mut self, size: Vec2) {
        self.meta.size = size;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn feeds(&self) -> &[PinRef] {
        &self.feeds
    }

    fn record_feed(&mut self, target: PinRef) {
        if !self.feeds.contains(&target) {
            self.feeds.push(target);
        }
    }

    fn remove_feed(&mut self, target: PinRef) {
        self.feeds.retain(|t| *t != target);
    }
}
