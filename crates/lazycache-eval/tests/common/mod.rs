//! Shared fixtures for lazycache-eval integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

use lazycache_eval::{CallArgs, Callable, EvalError, Operand};
use lazycache_storage::{InMemoryStore, KeyValueStore, StorageError};

/// `summ(a, b, c) = a + b + c`.
pub fn summ(args: &CallArgs) -> Result<Operand, EvalError> {
    args.expect_len(3)?;
    Ok(Operand::from(args.int(0)? + args.int(1)? + args.int(2)?))
}

/// A callable that counts its invocations and squares its argument.
pub fn counting_square(calls: Rc<Cell<usize>>) -> Callable {
    Callable::new("square", module_path!(), move |args: &CallArgs| {
        calls.set(calls.get() + 1);
        let x = args.int(0)?;
        Ok(Operand::from(x * x))
    })
}

/// Store-call counters shared with a [`CountingStore`].
#[derive(Debug, Default, Clone)]
pub struct StoreCalls {
    pub contains: Rc<Cell<usize>>,
    pub get: Rc<Cell<usize>>,
    pub put: Rc<Cell<usize>>,
    pub delete: Rc<Cell<usize>>,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.contains.get() + self.get.get() + self.put.get() + self.delete.get()
    }

    pub fn reset(&self) {
        self.contains.set(0);
        self.get.set(0);
        self.put.set(0);
        self.delete.set(0);
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// An in-memory store that counts every call made to it.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    pub calls: StoreCalls,
}

impl CountingStore {
    pub fn new() -> (Self, StoreCalls) {
        let store = CountingStore::default();
        let calls = store.calls.clone();
        (store, calls)
    }
}

impl KeyValueStore for CountingStore {
    fn contains(&mut self, key: &str) -> Result<bool, StorageError> {
        bump(&self.calls.contains);
        self.inner.contains(key)
    }

    fn get(&mut self, key: &str) -> Result<Vec<u8>, StorageError> {
        bump(&self.calls.get);
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        bump(&self.calls.put);
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        bump(&self.calls.delete);
        self.inner.delete(key)
    }

    fn keys(&mut self) -> Result<BTreeSet<String>, StorageError> {
        self.inner.keys()
    }
}
