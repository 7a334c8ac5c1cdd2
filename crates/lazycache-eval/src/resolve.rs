//! Resolution of lazy nodes.
//!
//! # State machine
//!
//! 1. A filled value slot is returned as is (literals, resolved nodes).
//! 2. With `decache` on, the store is asked for the node's key; a decodable
//!    entry fills the slot. A corrupt entry is evicted and treated as a miss.
//! 3. Otherwise the call target and every operand are resolved depth-first,
//!    positional operands first, then keyword operands in insertion order.
//!    The operation is applied and, if it returned more nodes, those are
//!    resolved too.
//! 4. With `encache` on, the value is encoded and written under the node's
//!    key before the slot is filled.
//!
//! A failure at any step leaves the slot empty, so the next call retries.

use indexmap::IndexMap;
use lazycache_core::ops::{get_attr, get_index};
use lazycache_core::Value;

use crate::callable::CallArgs;
use crate::error::EvalError;
use crate::node::{Deferred, LazyNode};
use crate::operand::Operand;
use crate::trace::ResolutionKind;

impl LazyNode {
    /// Materializes this node's value.
    pub fn resolve(&self) -> Result<Value, EvalError> {
        let factory = self.factory();

        if let (true, Some(class)) = (factory.strict(), self.hazard()) {
            return Err(EvalError::UnstableFingerprint {
                class: class.to_string(),
            });
        }

        if let Some(value) = self.peek() {
            let kind = if self.deferred().is_endpoint() {
                ResolutionKind::Endpoint
            } else {
                ResolutionKind::Fetched
            };
            factory.record(self, kind, &value);
            return Ok(value);
        }

        if let Deferred::Function(_) = self.deferred() {
            return Err(EvalError::NoValue);
        }

        let key = self.hex();
        if self.decache() {
            if let Some(value) = factory.load(&key)? {
                self.fill(value.clone());
                factory.record(self, ResolutionKind::Loaded, &value);
                return Ok(value);
            }
        }

        let value = self.evaluate()?;
        let kind = if self.encache() {
            factory.save(&key, &value)?;
            ResolutionKind::Saved
        } else {
            ResolutionKind::Evaluated
        };
        self.fill(value.clone());
        factory.record(self, kind, &value);
        Ok(value)
    }

    fn fill(&self, value: Value) {
        *self.0.value.borrow_mut() = Some(value);
    }

    fn evaluate(&self) -> Result<Value, EvalError> {
        match self.deferred() {
            Deferred::Literal(value) => Ok(value.clone()),
            Deferred::Function(_) => Err(EvalError::NoValue),
            Deferred::Call(target) => {
                let callable = match target.deferred() {
                    Deferred::Function(callable) => callable.clone(),
                    _ => {
                        let value = target.resolve()?;
                        return Err(EvalError::NotCallable {
                            type_name: value.type_name().to_string(),
                        });
                    }
                };
                let (positional, keyword) = self.resolve_operands()?;
                let args = CallArgs::new(callable.name(), positional, keyword);
                let result = callable.invoke(&args)?;
                result.resolve()
            }
            Deferred::Attr(name) => {
                let (positional, _) = self.resolve_operands()?;
                Ok(get_attr(operand_at(&positional, 0)?, name)?)
            }
            Deferred::Index => {
                let (positional, _) = self.resolve_operands()?;
                Ok(get_index(operand_at(&positional, 0)?, operand_at(&positional, 1)?)?)
            }
            Deferred::Binary(op) => {
                let (positional, _) = self.resolve_operands()?;
                Ok(op.apply(operand_at(&positional, 0)?, operand_at(&positional, 1)?)?)
            }
            Deferred::Unary(op) => {
                let (positional, _) = self.resolve_operands()?;
                Ok(op.apply(operand_at(&positional, 0)?)?)
            }
        }
    }

    fn resolve_operands(&self) -> Result<(Vec<Value>, IndexMap<String, Value>), EvalError> {
        let positional = self
            .args()
            .iter()
            .map(Operand::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let keyword = self
            .kwargs()
            .iter()
            .map(|(name, operand)| Ok((name.clone(), operand.resolve()?)))
            .collect::<Result<IndexMap<_, _>, EvalError>>()?;
        Ok((positional, keyword))
    }
}

fn operand_at(values: &[Value], index: usize) -> Result<&Value, EvalError> {
    values.get(index).ok_or_else(|| EvalError::Argument {
        function: "operator".to_string(),
        reason: format!("missing operand {index}"),
    })
}
