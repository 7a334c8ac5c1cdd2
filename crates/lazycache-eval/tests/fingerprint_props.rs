//! Property tests for fingerprint determinism and structural sensitivity.

mod common;

use indexmap::IndexMap;
use lazycache_eval::{callable, HashAlgorithm, Lazy, Operand, Value};
use proptest::prelude::*;

use common::summ;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        prop_oneof![Just(f64::INFINITY), Just(f64::NEG_INFINITY), Just(f64::NAN)]
            .prop_map(Value::Float),
        "[a-z0-9 ]{0,12}".prop_map(Value::Str),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Tuple),
            proptest::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Map(m.into_iter().collect())),
        ]
    })
}

fn algorithm() -> impl Strategy<Value = HashAlgorithm> {
    prop_oneof![Just(HashAlgorithm::Blake3), Just(HashAlgorithm::Sha256)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn same_tree_same_fingerprint_across_factories(
        a in value(),
        b in value(),
        algo in algorithm(),
    ) {
        let build = || {
            let lazy = Lazy::builder()
                .encache(false)
                .decache(false)
                .algorithm(algo)
                .build();
            let f = lazy.function(callable!(summ));
            f.call([lazy.lazy(a.clone()), lazy.lazy(b.clone())]).fingerprint()
        };
        prop_assert_eq!(build(), build());
    }

    #[test]
    fn swapping_distinct_arguments_changes_fingerprint(a in value(), b in value()) {
        // NaN never compares equal, so distinctness goes by rendered form.
        prop_assume!(a.to_string() != b.to_string());
        let lazy = Lazy::builder().encache(false).decache(false).build();
        let f = lazy.function(callable!(summ));
        let ab = f.call([Operand::from(a.clone()), Operand::from(b.clone())]);
        let ba = f.call([Operand::from(b), Operand::from(a)]);
        prop_assert_ne!(ab.fingerprint(), ba.fingerprint());
    }

    #[test]
    fn keyword_insertion_order_is_irrelevant(
        entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 1..6),
    ) {
        let lazy = Lazy::builder().encache(false).decache(false).build();
        let f = lazy.function(callable!(summ));

        let forward: IndexMap<String, Operand> = entries
            .iter()
            .map(|(k, v)| (k.clone(), Operand::from(*v)))
            .collect();
        let backward: IndexMap<String, Operand> = entries
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), Operand::from(*v)))
            .collect();

        prop_assert_eq!(
            f.call_with(Vec::<Operand>::new(), forward).fingerprint(),
            f.call_with(Vec::<Operand>::new(), backward).fingerprint()
        );
    }
}
