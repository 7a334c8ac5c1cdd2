//! Lazy nodes: deferred computations identified by fingerprint.
//!
//! A [`LazyNode`] records an operation ([`Deferred`]) and its operands
//! without running anything. Builders on the node (`call`, `attr`, `index`,
//! `binary`, `unary`) return new nodes that refer to it, so arbitrarily long
//! chains stay deferred until [`LazyNode::resolve`] is called.
//!
//! Whether an operation is valid for the runtime value is only known at
//! resolution; builders never fail. Type errors surface as
//! [`EvalError::Core`](crate::EvalError::Core) or
//! [`EvalError::NotCallable`](crate::EvalError::NotCallable) from `resolve`.
//!
//! Nodes compare and hash by fingerprint: two structurally identical nodes
//! are equal even if built separately.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use lazycache_core::{BinaryOp, Fingerprint, UnaryOp, Value};
use smallvec::SmallVec;

use crate::callable::Callable;
use crate::factory::Lazy;
use crate::operand::Operand;

/// The operation a node defers.
#[derive(Debug, Clone)]
pub enum Deferred {
    /// A literal endpoint; its value is known at construction.
    Literal(Value),
    /// A function endpoint, callable but without a value of its own.
    Function(Callable),
    /// A call of the target node with the node's operands.
    Call(LazyNode),
    /// Attribute lookup on the single operand.
    Attr(String),
    /// Subscript of the first operand by the second.
    Index,
    Binary(BinaryOp),
    Unary(UnaryOp),
}

impl Deferred {
    /// Class tag hashed first into every fingerprint.
    pub fn class_tag(&self) -> &'static str {
        match self {
            Deferred::Literal(_) => "LazyNode::Literal",
            Deferred::Function(_) => "LazyNode::Function",
            Deferred::Call(_) => "LazyNode::Call",
            Deferred::Attr(_) => "LazyNode::Attr",
            Deferred::Index => "LazyNode::Index",
            Deferred::Binary(_) => "LazyNode::Binary",
            Deferred::Unary(_) => "LazyNode::Unary",
        }
    }

    /// Endpoints are never computed, fetched or stored.
    pub fn is_endpoint(&self) -> bool {
        matches!(self, Deferred::Literal(_) | Deferred::Function(_))
    }
}

/// Positional operands; most nodes have at most a handful.
pub type Args = SmallVec<[Operand; 4]>;

pub(crate) struct NodeInner {
    pub(crate) factory: Rc<Lazy>,
    pub(crate) deferred: Deferred,
    pub(crate) args: Args,
    pub(crate) kwargs: IndexMap<String, Operand>,
    pub(crate) hint: Option<Value>,
    pub(crate) fingerprint: Fingerprint,
    /// First object class whose fingerprint was unstable, in this node or
    /// any node below it.
    pub(crate) hazard: Option<String>,
    pub(crate) encache: Cell<bool>,
    pub(crate) decache: Cell<bool>,
    pub(crate) onuse: Cell<bool>,
    pub(crate) value: RefCell<Option<Value>>,
}

/// A shared handle to a deferred computation.
#[derive(Clone)]
pub struct LazyNode(pub(crate) Rc<NodeInner>);

/// Per-node overrides of the factory's store and expand defaults, applied
/// when the node is built and so before any eager resolution.
///
/// `None` inherits the factory setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub encache: Option<bool>,
    pub decache: Option<bool>,
    pub onuse: Option<bool>,
}

impl NodeFlags {
    /// No store access; the default for attribute and index nodes.
    pub const NO_STORE: NodeFlags = NodeFlags {
        encache: Some(false),
        decache: Some(false),
        onuse: None,
    };

    pub fn new() -> Self {
        Self::default()
    }

    pub fn encache(mut self, enabled: bool) -> Self {
        self.encache = Some(enabled);
        self
    }

    pub fn decache(mut self, enabled: bool) -> Self {
        self.decache = Some(enabled);
        self
    }

    pub fn onuse(mut self, enabled: bool) -> Self {
        self.onuse = Some(enabled);
        self
    }
}

impl LazyNode {
    pub fn fingerprint(&self) -> Fingerprint {
        self.0.fingerprint
    }

    /// Store key: lowercase hex of the fingerprint.
    pub fn hex(&self) -> String {
        self.0.fingerprint.to_hex()
    }

    pub fn deferred(&self) -> &Deferred {
        &self.0.deferred
    }

    pub fn args(&self) -> &[Operand] {
        &self.0.args
    }

    pub fn kwargs(&self) -> &IndexMap<String, Operand> {
        &self.0.kwargs
    }

    pub fn hint(&self) -> Option<&Value> {
        self.0.hint.as_ref()
    }

    pub fn factory(&self) -> &Rc<Lazy> {
        &self.0.factory
    }

    /// Class whose fallback representation made this fingerprint unstable.
    pub fn hazard(&self) -> Option<&str> {
        self.0.hazard.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.0.value.borrow().is_some()
    }

    /// The materialized value, without resolving.
    pub fn peek(&self) -> Option<Value> {
        self.0.value.borrow().clone()
    }

    pub fn encache(&self) -> bool {
        self.0.encache.get()
    }

    pub fn decache(&self) -> bool {
        self.0.decache.get()
    }

    pub fn onuse(&self) -> bool {
        self.0.onuse.get()
    }

    /// Enables or disables writing this node's result to the store.
    pub fn set_encache(&self, enabled: bool) -> &Self {
        self.0.encache.set(enabled);
        self
    }

    /// Enables or disables reading this node's result from the store.
    pub fn set_decache(&self, enabled: bool) -> &Self {
        self.0.decache.set(enabled);
        self
    }

    pub fn set_onuse(&self, enabled: bool) -> &Self {
        self.0.onuse.set(enabled);
        self
    }

    /// Disables both store reads and writes for this node.
    pub fn nocache(&self) -> &Self {
        self.set_encache(false).set_decache(false)
    }

    // -------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------

    /// Defers a call of this node with positional arguments.
    pub fn call<I, A>(&self, args: I) -> LazyNode
    where
        I: IntoIterator<Item = A>,
        A: Into<Operand>,
    {
        self.call_hinted(args, IndexMap::new(), None::<Value>)
    }

    /// Defers a call with positional and keyword arguments.
    pub fn call_with<I, A>(&self, args: I, kwargs: IndexMap<String, Operand>) -> LazyNode
    where
        I: IntoIterator<Item = A>,
        A: Into<Operand>,
    {
        self.call_hinted(args, kwargs, None::<Value>)
    }

    /// Defers a call with a disambiguation hint folded into the fingerprint.
    pub fn call_hinted<I, A, H>(
        &self,
        args: I,
        kwargs: IndexMap<String, Operand>,
        hint: Option<H>,
    ) -> LazyNode
    where
        I: IntoIterator<Item = A>,
        A: Into<Operand>,
        H: Into<Value>,
    {
        self.call_flagged(args, kwargs, hint, NodeFlags::default())
    }

    /// Defers a call whose store flags are fixed at construction, before
    /// `fastdo`, `onplace` or `onuse` can resolve it.
    pub fn call_flagged<I, A, H>(
        &self,
        args: I,
        kwargs: IndexMap<String, Operand>,
        hint: Option<H>,
        flags: NodeFlags,
    ) -> LazyNode
    where
        I: IntoIterator<Item = A>,
        A: Into<Operand>,
        H: Into<Value>,
    {
        let args: Args = args.into_iter().map(Into::into).collect();
        self.derive(
            Deferred::Call(self.clone()),
            args,
            kwargs,
            hint.map(Into::into),
            flags,
        )
    }

    /// Defers attribute lookup.
    pub fn attr(&self, name: impl Into<String>) -> LazyNode {
        let args: Args = smallvec::smallvec![Operand::Node(self.clone())];
        self.derive(
            Deferred::Attr(name.into()),
            args,
            IndexMap::new(),
            None,
            NodeFlags::NO_STORE,
        )
    }

    /// Defers subscript by `key`.
    pub fn index(&self, key: impl Into<Operand>) -> LazyNode {
        let args: Args = smallvec::smallvec![Operand::Node(self.clone()), key.into()];
        self.derive(Deferred::Index, args, IndexMap::new(), None, NodeFlags::NO_STORE)
    }

    /// Defers `self <op> rhs`.
    pub fn binary(&self, op: BinaryOp, rhs: impl Into<Operand>) -> LazyNode {
        let args: Args = smallvec::smallvec![Operand::Node(self.clone()), rhs.into()];
        self.derive(Deferred::Binary(op), args, IndexMap::new(), None, NodeFlags::default())
    }

    /// Defers `lhs <op> self`, for operations whose left operand is not a
    /// node.
    pub fn binary_rev(&self, op: BinaryOp, lhs: impl Into<Operand>) -> LazyNode {
        let args: Args = smallvec::smallvec![lhs.into(), Operand::Node(self.clone())];
        self.derive(Deferred::Binary(op), args, IndexMap::new(), None, NodeFlags::default())
    }

    /// Defers `<op> self`.
    pub fn unary(&self, op: UnaryOp) -> LazyNode {
        let args: Args = smallvec::smallvec![Operand::Node(self.clone())];
        self.derive(Deferred::Unary(op), args, IndexMap::new(), None, NodeFlags::default())
    }

    fn derive(
        &self,
        deferred: Deferred,
        args: Args,
        kwargs: IndexMap<String, Operand>,
        hint: Option<Value>,
        flags: NodeFlags,
    ) -> LazyNode {
        let factory = self.factory();
        let node = factory.make_node(deferred, args, kwargs, hint, flags);
        if self.onuse() || factory.onplace() {
            node.resolve_or_warn();
        }
        node
    }

    /// Resolves at construction time. A failure is logged and left for the
    /// next explicit [`resolve`](Self::resolve) to report.
    pub(crate) fn resolve_or_warn(&self) {
        if let Err(err) = self.resolve() {
            tracing::warn!(
                target: "lazycache::eval",
                key = %self.hex(),
                error = %err,
                "eager resolution failed"
            );
        }
    }
}

impl PartialEq for LazyNode {
    fn eq(&self, other: &Self) -> bool {
        self.0.fingerprint == other.0.fingerprint
    }
}

impl Eq for LazyNode {}

impl Hash for LazyNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.fingerprint.hash(state);
    }
}

impl fmt::Debug for LazyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.hex();
        write!(f, "LazyNode({} {})", self.0.deferred.class_tag(), &hex[..12])
    }
}
