//! Deterministic fingerprinting of lazy nodes.
//!
//! A node's fingerprint is a digest over its class tag, the deferred
//! operation it wraps, its positional operands in order, its keyword
//! operands sorted by key, and an optional hint. Child nodes contribute
//! their own precomputed fingerprint, so a subtree is hashed once no matter
//! how many parents share it.
//!
//! # Encoding
//!
//! Every value is written as `<tag>` followed by a tag-specific body:
//!
//! - strings and bytes: byte length, `:`, raw bytes
//! - ints: decimal form; floats: shortest round-trip form
//! - sequences: length, then `index:` element `;` per element
//! - maps: length, then key/value pairs sorted by key
//! - nodes: `<node>` and the 32-byte child fingerprint
//!
//! Length prefixes and separators keep concatenations of different
//! structures from producing the same byte stream.
//!
//! # Dispatch
//!
//! Value categories are hashed through a [`HashRegistry`] owned by the
//! factory. Built-in categories are registered up front; object classes opt
//! in with [`HashRegistry::register`]. An object class with no routine falls
//! back to its textual representation, and if that representation is the
//! generic `<Class object>` default the fingerprint is flagged as unstable.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use lazycache_core::fingerprint::FINGERPRINT_LEN;
use lazycache_core::{Fingerprint, Value};
use sha2::Digest as _;

use crate::callable::Callable;
use crate::node::Deferred;
use crate::operand::Operand;

/// Digest algorithm used for node fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

enum Digest {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
}

impl Digest {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Digest::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Digest::Sha256(sha2::Sha256::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Digest::Blake3(hasher) => {
                hasher.update(bytes);
            }
            Digest::Sha256(hasher) => hasher.update(bytes),
        }
    }

    fn finalize(self) -> Fingerprint {
        let bytes: [u8; FINGERPRINT_LEN] = match self {
            Digest::Blake3(hasher) => *hasher.finalize().as_bytes(),
            Digest::Sha256(hasher) => hasher.finalize().into(),
        };
        Fingerprint(bytes)
    }
}

/// A hash-update routine for one value category.
pub type HashRoutine = Rc<dyn Fn(&mut NodeHasher<'_>, &Value)>;

/// Dispatch table from value category to hash routine.
///
/// Built-in categories (`none`, `bool`, `int`, `float`, `str`, `bytes`,
/// `list`, `tuple`, `map`) and object classes live in separate tables, so an
/// object class named `int` never picks up the integer routine.
#[derive(Clone)]
pub struct HashRegistry {
    routines: HashMap<String, HashRoutine>,
    classes: HashMap<String, HashRoutine>,
}

impl Default for HashRegistry {
    fn default() -> Self {
        let mut registry = HashRegistry {
            routines: HashMap::new(),
            classes: HashMap::new(),
        };
        registry.register("none", |_, _| {});
        registry.register("bool", |h, v| {
            if let Value::Bool(b) = v {
                h.update(if *b { b"1" } else { b"0" });
            }
        });
        registry.register("int", |h, v| {
            if let Value::Int(i) = v {
                h.number(i);
            }
        });
        registry.register("float", |h, v| {
            if let Value::Float(x) = v {
                h.update(format!("{x:?}").as_bytes());
            }
        });
        registry.register("str", |h, v| {
            if let Value::Str(s) = v {
                h.text(s);
            }
        });
        registry.register("bytes", |h, v| {
            if let Value::Bytes(b) = v {
                h.blob(b);
            }
        });
        registry.register("list", |h, v| {
            if let Value::List(items) = v {
                h.sequence(items, |h, item| h.value(item));
            }
        });
        registry.register("tuple", |h, v| {
            if let Value::Tuple(items) = v {
                h.sequence(items, |h, item| h.value(item));
            }
        });
        registry.register("map", |h, v| {
            if let Value::Map(map) = v {
                h.mapping(map, |h, item| h.value(item));
            }
        });
        registry
    }
}

impl HashRegistry {
    /// Creates a registry holding the built-in routines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the routine for a built-in `category`.
    pub fn register(
        &mut self,
        category: impl Into<String>,
        routine: impl Fn(&mut NodeHasher<'_>, &Value) + 'static,
    ) {
        self.routines.insert(category.into(), Rc::new(routine));
    }

    /// Registers (or replaces) the routine for objects of `class`.
    pub fn register_class(
        &mut self,
        class: impl Into<String>,
        routine: impl Fn(&mut NodeHasher<'_>, &Value) + 'static,
    ) {
        self.classes.insert(class.into(), Rc::new(routine));
    }

    /// Registers a routine hashing an object class by its fields, sorted by
    /// name. The object's textual representation is ignored.
    pub fn register_fields(&mut self, class: impl Into<String>) {
        self.register_class(class, |h, v| {
            if let Value::Object(obj) = v {
                h.mapping(&obj.fields, |h, field| h.value(field));
            }
        });
    }

    pub fn contains(&self, category: &str) -> bool {
        self.routines.contains_key(category)
    }

    pub fn contains_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn routine(&self, value: &Value) -> Option<&HashRoutine> {
        match value {
            Value::Object(obj) => self.classes.get(&obj.class),
            other => self.routines.get(category(other)),
        }
    }
}

impl fmt::Debug for HashRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut categories: Vec<&str> = self.routines.keys().map(String::as_str).collect();
        categories.sort_unstable();
        let mut classes: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        classes.sort_unstable();
        f.debug_struct("HashRegistry")
            .field("categories", &categories)
            .field("classes", &classes)
            .finish()
    }
}

/// Category tag for `value`. Every object shares the `object` tag; its class
/// name is hashed right after it.
pub fn category(value: &Value) -> &str {
    match value {
        Value::None => "none",
        Value::Object(_) => "object",
        other => other.type_name(),
    }
}

/// Incremental fingerprint state for one node.
pub struct NodeHasher<'a> {
    digest: Digest,
    registry: &'a HashRegistry,
    function_dump: bool,
    unstable: Vec<String>,
}

impl<'a> NodeHasher<'a> {
    pub fn new(algorithm: HashAlgorithm, registry: &'a HashRegistry, function_dump: bool) -> Self {
        NodeHasher {
            digest: Digest::new(algorithm),
            registry,
            function_dump,
            unstable: Vec::new(),
        }
    }

    /// Feeds raw bytes.
    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    pub fn tag(&mut self, tag: &str) {
        self.update(b"<");
        self.update(tag.as_bytes());
        self.update(b">");
    }

    pub fn number(&mut self, n: impl fmt::Display) {
        self.update(n.to_string().as_bytes());
    }

    /// Length-prefixed UTF-8 text.
    pub fn text(&mut self, s: &str) {
        self.blob(s.as_bytes());
    }

    /// Length-prefixed bytes.
    pub fn blob(&mut self, bytes: &[u8]) {
        self.number(bytes.len());
        self.update(b":");
        self.update(bytes);
    }

    /// Hashes `value`: category tag (plus class name for objects), then the
    /// registered routine.
    pub fn value(&mut self, value: &Value) {
        let registry = self.registry;
        self.tag(category(value));
        if let Value::Object(obj) = value {
            self.text(&obj.class);
        }
        match registry.routine(value) {
            Some(routine) => routine(self, value),
            None => self.fallback(value),
        }
    }

    /// Unregistered values hash their text. An object without a `repr` has
    /// only the generic `<Class object>` text, so its fields are hashed too and
    /// the class is reported as unstable.
    fn fallback(&mut self, value: &Value) {
        self.text(&value.to_string());
        if let Value::Object(obj) = value {
            if !obj.has_stable_repr() {
                self.unstable.push(obj.class.clone());
                self.mapping(&obj.fields, |h, field| h.value(field));
            }
        }
    }

    pub fn sequence<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        self.number(items.len());
        for (index, item) in items.iter().enumerate() {
            self.number(index);
            self.update(b":");
            each(self, item);
            self.update(b";");
        }
    }

    /// Hashes map entries in key order, whatever the insertion order.
    pub fn mapping<T>(&mut self, map: &IndexMap<String, T>, mut each: impl FnMut(&mut Self, &T)) {
        let mut entries: Vec<(&String, &T)> = map.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        self.number(entries.len());
        for (key, item) in entries {
            self.text(key);
            self.update(b"=");
            each(self, item);
            self.update(b";");
        }
    }

    pub fn callable(&mut self, callable: &Callable) {
        self.tag("callable");
        self.text(callable.name());
        self.text(callable.module());
        if self.function_dump {
            if let Some(source) = callable.source() {
                self.tag("source");
                self.text(source);
            }
        }
    }

    pub fn operand(&mut self, operand: &Operand) {
        match operand {
            Operand::Value(value) => self.value(value),
            Operand::Node(node) => {
                self.tag("node");
                self.update(node.fingerprint().as_bytes());
                if let Some(class) = node.hazard() {
                    self.unstable.push(class.to_string());
                }
            }
            Operand::List(items) => {
                self.tag("list");
                self.sequence(items, |h, item| h.operand(item));
            }
            Operand::Map(map) => {
                self.tag("map");
                self.mapping(map, |h, item| h.operand(item));
            }
        }
    }

    /// Object classes whose fingerprint fell back to the generic default
    /// representation, in the order they were met.
    pub fn unstable(&self) -> &[String] {
        &self.unstable
    }

    pub fn finish(self) -> (Fingerprint, Vec<String>) {
        (self.digest.finalize(), self.unstable)
    }
}

/// Everything that contributes to a node's identity.
pub(crate) struct NodeIdentity<'n> {
    pub deferred: &'n Deferred,
    pub args: &'n [Operand],
    pub kwargs: &'n IndexMap<String, Operand>,
    pub hint: Option<&'n Value>,
}

/// Computes the fingerprint of a node from its parts.
///
/// Returns the digest together with the classes that made it unstable.
pub(crate) fn fingerprint_node(
    identity: &NodeIdentity<'_>,
    algorithm: HashAlgorithm,
    registry: &HashRegistry,
    function_dump: bool,
) -> (Fingerprint, Vec<String>) {
    let mut h = NodeHasher::new(algorithm, registry, function_dump);
    h.tag(identity.deferred.class_tag());

    match identity.deferred {
        Deferred::Literal(value) => h.value(value),
        Deferred::Function(callable) => h.callable(callable),
        Deferred::Call(target) => h.operand(&Operand::Node(target.clone())),
        Deferred::Attr(name) => h.text(name),
        Deferred::Index => {}
        Deferred::Binary(op) => h.text(op.name()),
        Deferred::Unary(op) => h.text(op.name()),
    }

    if !identity.args.is_empty() {
        h.tag("args");
        h.sequence(identity.args, |h, arg| h.operand(arg));
    }
    if !identity.kwargs.is_empty() {
        h.tag("kwargs");
        h.mapping(identity.kwargs, |h, arg| h.operand(arg));
    }
    if let Some(hint) = identity.hint {
        h.tag("hint");
        h.value(hint);
    }

    h.finish()
}
