//! Functions that lazy call nodes invoke.
//!
//! A [`Callable`] pairs a Rust closure with the identity the fingerprint
//! engine hashes: a name, the defining module and, when available, the
//! source text. Build one with the [`callable!`](crate::callable) macro,
//! which fills all three in from the call site.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use lazycache_core::Value;

use crate::error::EvalError;
use crate::operand::Operand;

/// Name given to closures, which have no name of their own.
pub const ANONYMOUS: &str = "<closure>";

/// Signature of every invocable function.
pub type CallableFn = dyn Fn(&CallArgs) -> Result<Operand, EvalError>;

/// A named function that can be wrapped in a lazy endpoint.
#[derive(Clone)]
pub struct Callable {
    name: String,
    module: String,
    source: Option<String>,
    func: Rc<CallableFn>,
}

impl Callable {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        func: impl Fn(&CallArgs) -> Result<Operand, EvalError> + 'static,
    ) -> Self {
        Callable {
            name: name.into(),
            module: module.into(),
            source: None,
            func: Rc::new(func),
        }
    }

    /// Attaches source text. With `function_dump` on, editing the source
    /// changes the fingerprint of every call through this function.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    /// Closures share one name, so their identity is ambiguous without a
    /// hint or source text.
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }

    /// Why a fingerprint through this function may not tell it apart from
    /// another closure. Only unhinted closures have a gap; hashed source text
    /// still misses captured values.
    pub fn identity_gap(&self, hinted: bool, source_hashed: bool) -> Option<&'static str> {
        if !self.is_anonymous() || hinted {
            None
        } else if source_hashed {
            Some("captured values are not part of the fingerprint")
        } else {
            Some("fingerprint is shared with every other unhinted closure in the module")
        }
    }

    pub fn invoke(&self, args: &CallArgs) -> Result<Operand, EvalError> {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// Resolved arguments handed to a [`Callable`].
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs {
    function: String,
    pub positional: Vec<Value>,
    pub keyword: IndexMap<String, Value>,
}

impl CallArgs {
    pub fn new(
        function: impl Into<String>,
        positional: Vec<Value>,
        keyword: IndexMap<String, Value>,
    ) -> Self {
        CallArgs {
            function: function.into(),
            positional,
            keyword,
        }
    }

    /// Name of the function being invoked.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Positional argument `index`.
    pub fn arg(&self, index: usize) -> Result<&Value, EvalError> {
        self.positional
            .get(index)
            .ok_or_else(|| self.bad_argument(format!("missing positional argument {index}")))
    }

    pub fn int(&self, index: usize) -> Result<i64, EvalError> {
        let value = self.arg(index)?;
        value.as_int().ok_or_else(|| {
            self.bad_argument(format!(
                "argument {index} must be int, got {}",
                value.type_name()
            ))
        })
    }

    pub fn float(&self, index: usize) -> Result<f64, EvalError> {
        let value = self.arg(index)?;
        value.as_float().ok_or_else(|| {
            self.bad_argument(format!(
                "argument {index} must be a number, got {}",
                value.type_name()
            ))
        })
    }

    pub fn str(&self, index: usize) -> Result<&str, EvalError> {
        let value = self.arg(index)?;
        value.as_str().ok_or_else(|| {
            self.bad_argument(format!(
                "argument {index} must be str, got {}",
                value.type_name()
            ))
        })
    }

    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    /// Fails unless exactly `count` positional arguments were passed.
    pub fn expect_len(&self, count: usize) -> Result<(), EvalError> {
        if self.positional.len() == count {
            Ok(())
        } else {
            Err(self.bad_argument(format!(
                "expected {count} positional arguments, got {}",
                self.positional.len()
            )))
        }
    }

    /// Builds an [`EvalError::Callable`] attributed to this function.
    pub fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Callable {
            function: self.function.clone(),
            message: message.into(),
        }
    }

    fn bad_argument(&self, reason: String) -> EvalError {
        EvalError::Argument {
            function: self.function.clone(),
            reason,
        }
    }
}

/// Builds a [`Callable`] with its name, module and source taken from the
/// call site.
///
/// ```
/// use lazycache_eval::{callable, CallArgs, Operand, EvalError};
///
/// fn double(args: &CallArgs) -> Result<Operand, EvalError> {
///     Ok(Operand::from(args.int(0)? * 2))
/// }
///
/// // A named function item: identity is its name and module.
/// let by_path = callable!(double);
/// assert_eq!(by_path.name(), "double");
///
/// // An inline definition also records its source text.
/// let inline = callable!(fn triple(args) { Ok(Operand::from(args.int(0)? * 3)) });
/// assert!(inline.source().is_some());
///
/// // A closure is anonymous.
/// let closure = callable!(|args| Ok(Operand::from(args.int(0)? + 1)));
/// assert!(closure.is_anonymous());
/// ```
#[macro_export]
macro_rules! callable {
    (fn $name:ident($args:ident) $body:block) => {
        $crate::Callable::new(
            stringify!($name),
            module_path!(),
            move |$args: &$crate::CallArgs| -> ::std::result::Result<$crate::Operand, $crate::EvalError> {
                $body
            },
        )
        .with_source(stringify!(fn $name($args) $body))
    };
    (|$args:ident| $body:expr) => {
        $crate::Callable::new(
            $crate::callable::ANONYMOUS,
            module_path!(),
            move |$args: &$crate::CallArgs| -> ::std::result::Result<$crate::Operand, $crate::EvalError> {
                $body
            },
        )
        .with_source(stringify!(|$args| $body))
    };
    ($path:path) => {
        $crate::Callable::new(stringify!($path), module_path!(), $path)
    };
}
