//! The lazy factory: policy, hashing and store access for a family of nodes.
//!
//! A [`Lazy`] owns the backing store, the codec and the hash registry, and
//! holds the default flags every node it creates starts from. Nodes keep an
//! `Rc<Lazy>` back to their factory; all store traffic goes through it.
//!
//! # Policies
//!
//! - `encache` / `decache`: default write/read of resolved values.
//! - `fastdo`: resolve every derived node as soon as it is built.
//! - `onplace`: [`Lazy::invoke`] returns the resolved value instead of a
//!   node, and node builders resolve immediately.
//! - `onuse`: nodes built from a node with this flag resolve immediately.
//!
//! Flags live in `Cell`s and may be flipped at runtime; a change affects
//! nodes built or resolved afterwards.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;
use lazycache_core::Value;
use lazycache_storage::{DirStore, InMemoryStore, KeyValueStore, StorageError};

use crate::callable::Callable;
use crate::codec::{Codec, JsonCodec};
use crate::error::EvalError;
use crate::hash::{fingerprint_node, HashAlgorithm, HashRegistry, NodeHasher, NodeIdentity};
use crate::node::{Args, Deferred, LazyNode, NodeFlags, NodeInner};
use crate::operand::Operand;
use crate::trace::{ResolutionKind, TraceEntry};

/// Result of [`Lazy::invoke`]: a node, or its value under `onplace`.
#[derive(Debug, Clone)]
pub enum Evaluated {
    Node(LazyNode),
    Value(Value),
}

impl Evaluated {
    /// Resolves to a value whichever form was returned.
    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Evaluated::Node(node) => node.resolve(),
            Evaluated::Value(value) => Ok(value),
        }
    }

    pub fn node(&self) -> Option<&LazyNode> {
        match self {
            Evaluated::Node(node) => Some(node),
            Evaluated::Value(_) => None,
        }
    }
}

impl From<Evaluated> for Operand {
    fn from(evaluated: Evaluated) -> Self {
        match evaluated {
            Evaluated::Node(node) => Operand::Node(node),
            Evaluated::Value(value) => Operand::Value(value),
        }
    }
}

/// Factory and policy holder for lazy nodes.
pub struct Lazy {
    store: RefCell<Option<Box<dyn KeyValueStore>>>,
    codec: Box<dyn Codec>,
    algorithm: HashAlgorithm,
    registry: HashRegistry,
    encache: Cell<bool>,
    decache: Cell<bool>,
    onplace: Cell<bool>,
    onuse: Cell<bool>,
    fastdo: Cell<bool>,
    diag: Cell<bool>,
    diag_values: Cell<bool>,
    print_invokes: Cell<bool>,
    profile_hashing: Cell<bool>,
    function_dump: bool,
    strict: Cell<bool>,
    trace: RefCell<Option<Vec<TraceEntry>>>,
}

/// Builder for [`Lazy`]. Defaults: no store, blake3, JSON codec, read and
/// write enabled, function source hashed, every other flag off.
pub struct LazyBuilder {
    store: Option<Box<dyn KeyValueStore>>,
    codec: Box<dyn Codec>,
    algorithm: HashAlgorithm,
    registry: HashRegistry,
    encache: bool,
    decache: bool,
    onplace: bool,
    onuse: bool,
    fastdo: bool,
    diag: bool,
    diag_values: bool,
    print_invokes: bool,
    profile_hashing: bool,
    function_dump: bool,
    strict: bool,
    trace: bool,
}

impl Default for LazyBuilder {
    fn default() -> Self {
        LazyBuilder {
            store: None,
            codec: Box::new(JsonCodec),
            algorithm: HashAlgorithm::default(),
            registry: HashRegistry::new(),
            encache: true,
            decache: true,
            onplace: false,
            onuse: false,
            fastdo: false,
            diag: false,
            diag_values: false,
            print_invokes: false,
            profile_hashing: false,
            function_dump: true,
            strict: false,
            trace: false,
        }
    }
}

impl LazyBuilder {
    pub fn store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Uses a flat [`DirStore`] rooted at `path`, creating the directory.
    pub fn store_path(self, path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let store = DirStore::open(path)?;
        Ok(self.store(store))
    }

    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn encache(mut self, enabled: bool) -> Self {
        self.encache = enabled;
        self
    }

    pub fn decache(mut self, enabled: bool) -> Self {
        self.decache = enabled;
        self
    }

    pub fn onplace(mut self, enabled: bool) -> Self {
        self.onplace = enabled;
        self
    }

    pub fn onuse(mut self, enabled: bool) -> Self {
        self.onuse = enabled;
        self
    }

    pub fn fastdo(mut self, enabled: bool) -> Self {
        self.fastdo = enabled;
        self
    }

    pub fn diag(mut self, enabled: bool) -> Self {
        self.diag = enabled;
        self
    }

    pub fn diag_values(mut self, enabled: bool) -> Self {
        self.diag_values = enabled;
        self
    }

    pub fn print_invokes(mut self, enabled: bool) -> Self {
        self.print_invokes = enabled;
        self
    }

    pub fn profile_hashing(mut self, enabled: bool) -> Self {
        self.profile_hashing = enabled;
        self
    }

    /// Hash captured callable source text into fingerprints.
    pub fn function_dump(mut self, enabled: bool) -> Self {
        self.function_dump = enabled;
        self
    }

    /// Turn unstable fingerprints into errors.
    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Record a [`TraceEntry`] per resolution.
    pub fn trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Registers a fingerprint routine for an object class.
    pub fn register_hasher(
        mut self,
        class: impl Into<String>,
        routine: impl Fn(&mut NodeHasher<'_>, &Value) + 'static,
    ) -> Self {
        self.registry.register_class(class, routine);
        self
    }

    pub fn build(self) -> Rc<Lazy> {
        if self.store.is_none() {
            if self.encache {
                tracing::warn!("no store configured, but encache is enabled");
            }
            if self.decache {
                tracing::warn!("no store configured, but decache is enabled");
            }
        }
        if self.diag_values && !self.diag {
            tracing::warn!("diag_values is enabled, but diag is disabled");
        }

        Rc::new(Lazy {
            store: RefCell::new(self.store),
            codec: self.codec,
            algorithm: self.algorithm,
            registry: self.registry,
            encache: Cell::new(self.encache),
            decache: Cell::new(self.decache),
            onplace: Cell::new(self.onplace),
            onuse: Cell::new(self.onuse),
            fastdo: Cell::new(self.fastdo),
            diag: Cell::new(self.diag),
            diag_values: Cell::new(self.diag_values),
            print_invokes: Cell::new(self.print_invokes),
            profile_hashing: Cell::new(self.profile_hashing),
            function_dump: self.function_dump,
            strict: Cell::new(self.strict),
            trace: RefCell::new(self.trace.then(Vec::new)),
        })
    }
}

impl Lazy {
    pub fn builder() -> LazyBuilder {
        LazyBuilder::default()
    }

    /// In-memory memoization: results are kept for the life of the factory
    /// and nodes expand as soon as they are used.
    pub fn memoize() -> Rc<Lazy> {
        Lazy::builder()
            .store(InMemoryStore::new())
            .onuse(true)
            .build()
    }

    /// No store at all: nodes exist only for their fingerprints and are
    /// evaluated once, as soon as they are built.
    pub fn hash_only() -> Rc<Lazy> {
        Lazy::builder()
            .encache(false)
            .decache(false)
            .fastdo(true)
            .build()
    }

    // -------------------------------------------------------------------
    // Endpoints
    // -------------------------------------------------------------------

    /// Wraps a literal value.
    pub fn lazy(self: &Rc<Self>, value: impl Into<Value>) -> LazyNode {
        self.endpoint(Deferred::Literal(value.into()), None)
    }

    /// Wraps a literal value with a disambiguation hint.
    pub fn lazy_hinted(self: &Rc<Self>, value: impl Into<Value>, hint: impl Into<Value>) -> LazyNode {
        self.endpoint(Deferred::Literal(value.into()), Some(hint.into()))
    }

    /// Wraps a function so calls through it build lazy nodes.
    pub fn function(self: &Rc<Self>, callable: Callable) -> LazyNode {
        self.endpoint(Deferred::Function(callable), None)
    }

    /// Wraps a function whose name alone is not a stable identity, such as
    /// a closure.
    pub fn function_with_hint(self: &Rc<Self>, callable: Callable, hint: impl Into<Value>) -> LazyNode {
        self.endpoint(Deferred::Function(callable), Some(hint.into()))
    }

    fn endpoint(self: &Rc<Self>, deferred: Deferred, hint: Option<Value>) -> LazyNode {
        if let Deferred::Function(callable) = &deferred {
            let source_hashed = self.function_dump && callable.source().is_some();
            if let Some(gap) = callable.identity_gap(hint.is_some(), source_hashed) {
                tracing::warn!(
                    module = callable.module(),
                    "closure wrapped without a hint: {gap}"
                );
            }
        }
        self.make_node(deferred, Args::new(), IndexMap::new(), hint, NodeFlags::default())
    }

    /// Builds a call node of `target` and applies the factory policies.
    ///
    /// This is the fallible construction path: strict-mode fingerprint
    /// failures and eager-resolution failures are returned instead of logged.
    pub fn invoke<I, A>(
        self: &Rc<Self>,
        target: &LazyNode,
        args: I,
        kwargs: IndexMap<String, Operand>,
    ) -> Result<Evaluated, EvalError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Operand>,
    {
        self.invoke_flagged(target, args, kwargs, NodeFlags::default())
    }

    /// [`invoke`](Self::invoke) with per-node store overrides.
    pub fn invoke_flagged<I, A>(
        self: &Rc<Self>,
        target: &LazyNode,
        args: I,
        kwargs: IndexMap<String, Operand>,
        flags: NodeFlags,
    ) -> Result<Evaluated, EvalError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Operand>,
    {
        let args: Args = args.into_iter().map(Into::into).collect();
        let node = self.make_node_quiet(Deferred::Call(target.clone()), args, kwargs, None, flags);
        if let (true, Some(class)) = (self.strict(), node.hazard()) {
            return Err(EvalError::UnstableFingerprint {
                class: class.to_string(),
            });
        }
        if self.onplace() {
            return node.resolve().map(Evaluated::Value);
        }
        if self.fastdo() || target.onuse() {
            node.resolve()?;
        }
        Ok(Evaluated::Node(node))
    }

    // -------------------------------------------------------------------
    // Node construction
    // -------------------------------------------------------------------

    pub(crate) fn make_node(
        self: &Rc<Self>,
        deferred: Deferred,
        args: Args,
        kwargs: IndexMap<String, Operand>,
        hint: Option<Value>,
        flags: NodeFlags,
    ) -> LazyNode {
        let node = self.make_node_quiet(deferred, args, kwargs, hint, flags);
        if self.fastdo() && !node.deferred().is_endpoint() {
            node.resolve_or_warn();
        }
        node
    }

    fn make_node_quiet(
        self: &Rc<Self>,
        deferred: Deferred,
        args: Args,
        kwargs: IndexMap<String, Operand>,
        hint: Option<Value>,
        flags: NodeFlags,
    ) -> LazyNode {
        if self.print_invokes() && !deferred.is_endpoint() {
            tracing::debug!(
                target: "lazycache::invoke",
                kind = deferred.class_tag(),
                args = ?args,
                kwargs = ?kwargs,
                "building node"
            );
        }

        let started = self.profile_hashing().then(Instant::now);
        let identity = NodeIdentity {
            deferred: &deferred,
            args: &args,
            kwargs: &kwargs,
            hint: hint.as_ref(),
        };
        let (fingerprint, unstable) =
            fingerprint_node(&identity, self.algorithm, &self.registry, self.function_dump);
        if let Some(started) = started {
            tracing::trace!(
                target: "lazycache::hash",
                key = %fingerprint,
                elapsed_us = started.elapsed().as_micros() as u64,
                "hashed node"
            );
        }

        let hazard = unstable.into_iter().next();
        if let Some(class) = &hazard {
            if !self.strict() {
                tracing::warn!(
                    target: "lazycache::hash",
                    class = %class,
                    key = %fingerprint,
                    "fingerprint uses the default textual representation and may change between runs"
                );
            }
        }

        let value = match &deferred {
            Deferred::Literal(value) => Some(value.clone()),
            _ => None,
        };

        LazyNode(Rc::new(NodeInner {
            factory: Rc::clone(self),
            deferred,
            args,
            kwargs,
            hint,
            fingerprint,
            hazard,
            encache: Cell::new(flags.encache.unwrap_or_else(|| self.encache())),
            decache: Cell::new(flags.decache.unwrap_or_else(|| self.decache())),
            onuse: Cell::new(flags.onuse.unwrap_or_else(|| self.onuse())),
            value: RefCell::new(value),
        }))
    }

    // -------------------------------------------------------------------
    // Store access
    // -------------------------------------------------------------------

    pub fn has_store(&self) -> bool {
        self.store.borrow().is_some()
    }

    /// Runs `f` against the backing store, if there is one.
    ///
    /// The store is detached from the factory while `f` runs: nodes resolved
    /// inside `f` neither read nor write it.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut dyn KeyValueStore) -> R) -> Option<R> {
        let mut store = self.store.borrow_mut().take()?;
        let result = f(store.as_mut());
        *self.store.borrow_mut() = Some(store);
        Some(result)
    }

    /// Reads and decodes the entry for `key`. `Ok(None)` is a miss; an entry
    /// that fails to decode is evicted and also reported as a miss.
    pub(crate) fn load(&self, key: &str) -> Result<Option<Value>, EvalError> {
        let bytes = {
            let mut guard = self.store.borrow_mut();
            let Some(store) = guard.as_mut() else {
                return Ok(None);
            };
            if !store.contains(key)? {
                return Ok(None);
            }
            match store.get(key) {
                Ok(bytes) => bytes,
                Err(StorageError::NotFound(_)) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        };

        match self.codec.decode(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(
                    target: "lazycache::store",
                    key,
                    error = %err,
                    "corrupt cache entry, evicting and recomputing"
                );
                self.evict(key)?;
                Ok(None)
            }
        }
    }

    pub(crate) fn save(&self, key: &str, value: &Value) -> Result<(), EvalError> {
        let bytes = self.codec.encode(value)?;
        if let Some(store) = self.store.borrow_mut().as_mut() {
            store.put(key, &bytes)?;
        }
        Ok(())
    }

    fn evict(&self, key: &str) -> Result<(), EvalError> {
        let mut guard = self.store.borrow_mut();
        let Some(store) = guard.as_mut() else {
            return Ok(());
        };
        match store.delete(key) {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    // -------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------

    pub(crate) fn record(&self, node: &LazyNode, kind: ResolutionKind, value: &Value) {
        if self.diag() {
            if self.diag_values() {
                tracing::info!(target: "lazycache::diag", key = %node.hex(), %value, "{kind}");
            } else {
                tracing::info!(target: "lazycache::diag", key = %node.hex(), "{kind}");
            }
        }
        if let Some(trace) = self.trace.borrow_mut().as_mut() {
            trace.push(TraceEntry {
                fingerprint: node.fingerprint(),
                kind,
            });
        }
    }

    /// Resolution trace recorded so far; empty when tracing is off.
    pub fn trace(&self) -> Vec<TraceEntry> {
        self.trace.borrow().clone().unwrap_or_default()
    }

    pub fn clear_trace(&self) {
        if let Some(trace) = self.trace.borrow_mut().as_mut() {
            trace.clear();
        }
    }

    // -------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn registry(&self) -> &HashRegistry {
        &self.registry
    }

    pub fn encache(&self) -> bool {
        self.encache.get()
    }

    pub fn set_encache(&self, enabled: bool) {
        self.encache.set(enabled);
    }

    pub fn decache(&self) -> bool {
        self.decache.get()
    }

    pub fn set_decache(&self, enabled: bool) {
        self.decache.set(enabled);
    }

    pub fn onplace(&self) -> bool {
        self.onplace.get()
    }

    pub fn set_onplace(&self, enabled: bool) {
        self.onplace.set(enabled);
    }

    pub fn onuse(&self) -> bool {
        self.onuse.get()
    }

    pub fn set_onuse(&self, enabled: bool) {
        self.onuse.set(enabled);
    }

    pub fn fastdo(&self) -> bool {
        self.fastdo.get()
    }

    pub fn set_fastdo(&self, enabled: bool) {
        self.fastdo.set(enabled);
    }

    pub fn diag(&self) -> bool {
        self.diag.get()
    }

    pub fn set_diag(&self, enabled: bool) {
        self.diag.set(enabled);
    }

    pub fn diag_values(&self) -> bool {
        self.diag_values.get()
    }

    pub fn print_invokes(&self) -> bool {
        self.print_invokes.get()
    }

    pub fn set_print_invokes(&self, enabled: bool) {
        self.print_invokes.set(enabled);
    }

    pub fn profile_hashing(&self) -> bool {
        self.profile_hashing.get()
    }

    pub fn function_dump(&self) -> bool {
        self.function_dump
    }

    pub fn strict(&self) -> bool {
        self.strict.get()
    }

    pub fn set_strict(&self, enabled: bool) {
        self.strict.set(enabled);
    }
}
