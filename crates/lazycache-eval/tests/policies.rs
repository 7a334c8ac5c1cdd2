//! Factory policies: eager, onplace, onuse, presets, strict mode, hashing
//! options.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use indexmap::IndexMap;
use lazycache_eval::{
    callable, select, unlazy_if_need, CallArgs, Callable, EvalError, Evaluated, HashAlgorithm,
    Lazy, NodeFlags, Object, Operand, Value,
};
use lazycache_storage::InMemoryStore;

use common::{counting_square, summ, CountingStore};

// ---------------------------------------------------------------------
// Eager and immediate policies
// ---------------------------------------------------------------------

#[test]
fn fastdo_resolves_derived_nodes_at_construction() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).fastdo(true).build();
    let calls = Rc::new(Cell::new(0));
    let square = lazy.function(counting_square(calls.clone()));
    assert!(!square.is_resolved(), "function endpoints are never evaluated");

    let node = square.call([lazy.lazy(6)]);
    assert!(node.is_resolved());
    assert_eq!(node.peek(), Some(Value::Int(36)));
    assert_eq!(calls.get(), 1);
}

#[test]
fn eager_failure_is_logged_and_reported_on_resolve() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).fastdo(true).build();
    let node = &lazy.lazy("a") - 1;
    assert!(!node.is_resolved());
    assert!(matches!(node.resolve(), Err(EvalError::Core(_))));
}

#[test]
fn onplace_invoke_returns_the_value() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).onplace(true).build();
    let calls = Rc::new(Cell::new(0));
    let square = lazy.function(counting_square(calls.clone()));

    let result = lazy.invoke(&square, [lazy.lazy(3)], IndexMap::new()).unwrap();
    assert!(matches!(result, Evaluated::Value(Value::Int(9))));

    let again = lazy.invoke(&square, [lazy.lazy(3)], IndexMap::new()).unwrap();
    assert_eq!(again.into_value().unwrap(), Value::Int(9));
    assert_eq!(calls.get(), 1, "equal calls share the stored value");
}

#[test]
fn invoke_without_policies_returns_an_unresolved_node() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).build();
    let f = lazy.function(callable!(summ));
    let result = lazy.invoke(&f, [1, 2, 3], IndexMap::new()).unwrap();
    let node = result.node().cloned().unwrap();
    assert!(!node.is_resolved());
    assert_eq!(node, f.call([1, 2, 3]), "invoke and call build the same node");
}

#[test]
fn invoke_surfaces_eager_failures() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).fastdo(true).build();
    let f = lazy.function(callable!(summ));
    let err = lazy.invoke(&f, [1], IndexMap::new()).unwrap_err();
    assert!(matches!(err, EvalError::Argument { .. }), "got {err:?}");
}

#[test]
fn construction_flags_apply_before_eager_resolution() {
    let (store, store_calls) = CountingStore::new();
    let lazy = Lazy::builder().store(store).fastdo(true).build();
    let f = lazy.function(callable!(summ));

    let flags = NodeFlags::new().encache(false);
    let node = f.call_flagged([1, 2, 3], IndexMap::new(), None::<Value>, flags);
    assert_eq!(node.peek(), Some(Value::Int(6)));
    assert!(!node.encache());
    assert_eq!(store_calls.put.get(), 0, "no write happened before the flags applied");

    let plain = f.call([1, 2, 3]);
    assert_eq!(plain, node, "flags are not part of the fingerprint");
}

#[test]
fn invoke_flagged_skips_the_store_entirely() {
    let (store, store_calls) = CountingStore::new();
    let lazy = Lazy::builder().store(store).onplace(true).build();
    let f = lazy.function(callable!(summ));

    let result = lazy
        .invoke_flagged(&f, [4, 5, 6], IndexMap::new(), NodeFlags::NO_STORE)
        .unwrap();
    assert_eq!(result.into_value().unwrap(), Value::Int(15));
    assert_eq!(store_calls.total(), 0);
}

#[test]
fn onuse_expands_nodes_derived_from_flagged_nodes() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).build();
    let x = lazy.lazy(10);
    x.set_onuse(true);
    let doubled = &x * 2;
    assert!(doubled.is_resolved());

    let plain = lazy.lazy(10);
    assert!(!(&plain * 2).is_resolved());
}

// ---------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------

#[test]
fn memoize_caches_in_memory_and_expands_on_use() {
    let lazy = Lazy::memoize();
    assert!(lazy.has_store());
    let calls = Rc::new(Cell::new(0));
    let square = lazy.function(counting_square(calls.clone()));

    let first = square.call([12]);
    assert!(first.is_resolved());
    let second = square.call([12]);
    assert_eq!(second.peek(), Some(Value::Int(144)));
    assert_eq!(calls.get(), 1);
}

#[test]
fn hash_only_evaluates_once_without_a_store() {
    let lazy = Lazy::hash_only();
    assert!(!lazy.has_store());
    assert!(!lazy.encache());
    assert!(!lazy.decache());

    let calls = Rc::new(Cell::new(0));
    let node = lazy.function(counting_square(calls.clone())).call([4]);
    assert!(node.is_resolved());
    assert_eq!(node.resolve().unwrap(), Value::Int(16));
    assert_eq!(calls.get(), 1);
    assert_eq!(lazy.with_store(|_| ()), None);
}

// ---------------------------------------------------------------------
// Strict mode and unstable fingerprints
// ---------------------------------------------------------------------

fn opaque() -> Object {
    Object::new("Opaque").with_field("id", 1)
}

#[test]
fn unstable_fingerprint_is_a_warning_by_default() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).build();
    let node = lazy.lazy(opaque());
    assert_eq!(node.hazard(), Some("Opaque"));
    assert!(node.resolve().is_ok());
}

#[test]
fn strict_mode_rejects_unstable_fingerprints() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).strict(true).build();
    let identity = lazy.function(callable!(|args| Ok(Operand::from(args.arg(0)?.clone()))));
    let obj = lazy.lazy(opaque());

    let derived = identity.call([&obj]);
    assert_eq!(derived.hazard(), Some("Opaque"), "hazards propagate to parents");
    assert!(matches!(
        derived.resolve(),
        Err(EvalError::UnstableFingerprint { ref class }) if class == "Opaque"
    ));
    assert!(matches!(
        lazy.invoke(&identity, [&obj], IndexMap::new()),
        Err(EvalError::UnstableFingerprint { .. })
    ));
}

#[test]
fn registered_hasher_makes_a_class_stable() {
    let lazy = Lazy::builder()
        .store(InMemoryStore::new())
        .strict(true)
        .register_hasher("Opaque", |h, v| {
            if let Value::Object(obj) = v {
                h.mapping(&obj.fields, |h, field| h.value(field));
            }
        })
        .build();
    let node = lazy.lazy(opaque());
    assert_eq!(node.hazard(), None);
    assert_eq!(node.resolve().unwrap(), Value::Object(opaque()));

    let other = lazy.lazy(Object::new("Opaque").with_field("id", 2));
    assert_ne!(node, other);
}

#[test]
fn object_classes_do_not_borrow_builtin_hashers() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).build();
    let one = lazy.lazy(Object::new("int").with_field("x", 1));
    let two = lazy.lazy(Object::new("int").with_field("x", 2));
    assert_eq!(one.hazard(), Some("int"));
    assert_ne!(one, two);
}

#[test]
fn strict_can_be_toggled_at_runtime() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).build();
    let node = lazy.lazy(opaque());
    lazy.set_strict(true);
    assert!(node.resolve().is_err());
    lazy.set_strict(false);
    assert!(node.resolve().is_ok());
}

// ---------------------------------------------------------------------
// Hashing options
// ---------------------------------------------------------------------

#[test]
fn algorithm_changes_every_key() {
    let blake = Lazy::builder().store(InMemoryStore::new()).build();
    let sha = Lazy::builder()
        .store(InMemoryStore::new())
        .algorithm(HashAlgorithm::Sha256)
        .build();
    assert_eq!(sha.algorithm(), HashAlgorithm::Sha256);
    assert_ne!(blake.lazy(1).fingerprint(), sha.lazy(1).fingerprint());
    assert_eq!(sha.lazy(1).hex().len(), 64);
}

fn versioned(source: &str) -> Callable {
    Callable::new("step", "pipeline", |args: &CallArgs| Ok(Operand::from(args.int(0)?)))
        .with_source(source)
}

#[test]
fn function_source_is_hashed_when_dumped() {
    let dumping = Lazy::builder().store(InMemoryStore::new()).build();
    assert!(dumping.function_dump());
    assert_ne!(
        dumping.function(versioned("v1")).call([1]),
        dumping.function(versioned("v2")).call([1]),
        "editing the function invalidates its results"
    );

    let plain = Lazy::builder()
        .store(InMemoryStore::new())
        .function_dump(false)
        .build();
    assert_eq!(
        plain.function(versioned("v1")).call([1]),
        plain.function(versioned("v2")).call([1])
    );
}

#[test]
fn hints_disambiguate_closures() {
    let lazy = Lazy::builder()
        .store(InMemoryStore::new())
        .function_dump(false)
        .build();
    let add = Callable::new("<closure>", module_path!(), |a: &CallArgs| {
        Ok(Operand::from(a.int(0)? + 1))
    });
    let sub = Callable::new("<closure>", module_path!(), |a: &CallArgs| {
        Ok(Operand::from(a.int(0)? - 1))
    });

    assert_eq!(
        lazy.function(add.clone()).fingerprint(),
        lazy.function(sub.clone()).fingerprint(),
        "unhinted closures collide"
    );

    let add = lazy.function_with_hint(add, "add");
    let sub = lazy.function_with_hint(sub, "sub");
    assert_ne!(add.fingerprint(), sub.fingerprint());
    assert_eq!(add.call([1]).resolve().unwrap(), Value::Int(2));
    assert_eq!(sub.call([1]).resolve().unwrap(), Value::Int(0));

    let f = lazy.function(callable!(summ));
    assert_ne!(
        f.call([1, 2, 3]),
        f.call_hinted([1, 2, 3], IndexMap::new(), Some("other")),
    );
}

#[test]
fn literal_hints_are_part_of_identity() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).build();
    assert_ne!(lazy.lazy(1), lazy.lazy_hinted(1, "a"));
    assert_eq!(lazy.lazy_hinted(1, "a"), lazy.lazy_hinted(1, "a"));
}

// ---------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------

#[test]
fn select_filters_lazily_and_is_keyed_by_predicate() {
    let (store, calls) = CountingStore::new();
    let lazy = Lazy::builder().store(store).build();
    let numbers = lazy.lazy(vec![
        Value::Int(1),
        Value::Int(2),
        Value::Int(3),
        Value::Int(4),
    ]);
    let even = callable!(fn even(args) { Ok(Operand::from(args.int(0)? % 2 == 0)) });
    let odd = callable!(fn odd(args) { Ok(Operand::from(args.int(0)? % 2 != 0)) });

    let evens = select(&numbers, &even);
    let odds = select(&numbers, &odd);
    assert_ne!(evens, odds);
    assert_eq!(calls.total(), 0, "select builds without evaluating");

    assert_eq!(
        evens.resolve().unwrap(),
        Value::List(vec![Value::Int(2), Value::Int(4)])
    );
    assert_eq!(
        odds.resolve().unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(3)])
    );
}

#[test]
fn unlazy_if_need_accepts_values_and_nodes() {
    let lazy = Lazy::builder().store(InMemoryStore::new()).build();
    assert_eq!(unlazy_if_need(Value::Int(3)).unwrap(), Value::Int(3));
    assert_eq!(unlazy_if_need(&lazy.lazy(2) + 2).unwrap(), Value::Int(4));
}
