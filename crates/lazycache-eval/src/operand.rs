//! Arguments of a lazy node.
//!
//! An [`Operand`] is a plain [`Value`], a [`LazyNode`], or a container that
//! may hold nodes at any depth. Resolving an operand resolves every node it
//! contains, depth-first in order.

use indexmap::IndexMap;
use lazycache_core::Value;

use crate::error::EvalError;
use crate::node::LazyNode;

#[derive(Debug, Clone)]
pub enum Operand {
    Value(Value),
    Node(LazyNode),
    List(Vec<Operand>),
    Map(IndexMap<String, Operand>),
}

impl Operand {
    /// Builds a map operand from key/operand pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Operand)>) -> Operand {
        Operand::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// True if any node appears in this operand tree.
    pub fn has_nodes(&self) -> bool {
        match self {
            Operand::Value(_) => false,
            Operand::Node(_) => true,
            Operand::List(items) => items.iter().any(Operand::has_nodes),
            Operand::Map(map) => map.values().any(Operand::has_nodes),
        }
    }

    /// Resolves every node in the tree and returns the plain value.
    pub fn resolve(&self) -> Result<Value, EvalError> {
        match self {
            Operand::Value(value) => Ok(value.clone()),
            Operand::Node(node) => node.resolve(),
            Operand::List(items) => items
                .iter()
                .map(Operand::resolve)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Operand::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.resolve()?)))
                .collect::<Result<IndexMap<_, _>, EvalError>>()
                .map(Value::Map),
        }
    }

    /// The node, when this operand is a bare node.
    pub fn as_node(&self) -> Option<&LazyNode> {
        match self {
            Operand::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// Resolves `operand` if it contains nodes and passes plain values through.
pub fn unlazy_if_need(operand: impl Into<Operand>) -> Result<Value, EvalError> {
    operand.into().resolve()
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<LazyNode> for Operand {
    fn from(node: LazyNode) -> Self {
        Operand::Node(node)
    }
}

impl From<&LazyNode> for Operand {
    fn from(node: &LazyNode) -> Self {
        Operand::Node(node.clone())
    }
}

impl From<Vec<Operand>> for Operand {
    fn from(items: Vec<Operand>) -> Self {
        Operand::List(items)
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Value(Value::Bool(b))
    }
}

impl From<i64> for Operand {
    fn from(i: i64) -> Self {
        Operand::Value(Value::Int(i))
    }
}

impl From<i32> for Operand {
    fn from(i: i32) -> Self {
        Operand::Value(Value::from(i))
    }
}

impl From<f64> for Operand {
    fn from(x: f64) -> Self {
        Operand::Value(Value::Float(x))
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Value(Value::from(s))
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Value(Value::Str(s))
    }
}
