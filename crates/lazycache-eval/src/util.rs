//! Collection helpers built on lazy calls.

use indexmap::IndexMap;
use lazycache_core::Value;

use crate::callable::{CallArgs, Callable};
use crate::error::EvalError;
use crate::node::LazyNode;
use crate::operand::Operand;

/// Defers filtering the list produced by `list`, keeping the items for
/// which `predicate` returns a truthy value.
///
/// The node is hinted with the predicate's own fingerprint, so different
/// predicates over the same list get different keys.
pub fn select(list: &LazyNode, predicate: &Callable) -> LazyNode {
    let factory = list.factory();
    let hint = factory.function(predicate.clone()).hex();

    let pred = predicate.clone();
    let filter = Callable::new("select", module_path!(), move |args: &CallArgs| {
        let items = args.arg(0)?;
        let items = items.as_list().ok_or_else(|| EvalError::Argument {
            function: "select".to_string(),
            reason: format!("expected a list, got {}", items.type_name()),
        })?;
        let mut kept = Vec::new();
        for item in items {
            let verdict = pred
                .invoke(&CallArgs::new(pred.name(), vec![item.clone()], IndexMap::new()))?
                .resolve()?;
            if verdict.is_truthy() {
                kept.push(item.clone());
            }
        }
        Ok(Operand::Value(Value::List(kept)))
    });

    factory.function_with_hint(filter, hint).call([list])
}
