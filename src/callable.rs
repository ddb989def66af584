//! Callable plumbing: the wrapped function value, its generic argument set,
//! and the explicit caller context captured at invocation boundaries.

use crate::error::{EndowError, RuntimeResult};
use crate::values::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// The generic argument set of one call: ordered positional values plus
/// named values. Attachments extract their reserved keywords from the named
/// set before delegating; everything else reaches the callable untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub named: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self {
            positional: items.into_iter().map(Into::into).collect(),
            named: BTreeMap::new(),
        }
    }

    /// Append one positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Bind one named argument.
    pub fn named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Remove and return a named argument. Attachments use this to pull
    /// their reserved keywords out of the set before delegation.
    pub fn take_named(&mut self, key: &str) -> Option<Value> {
        self.named.remove(key)
    }

    pub fn get_positional(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn get_named(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }
}

/// A named function value over the dynamic value model. The name is the
/// callable's identity in log records and cache keys.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Rc<dyn Fn(&Args) -> RuntimeResult<Value>>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Args) -> RuntimeResult<Value> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &Args) -> RuntimeResult<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable").field("name", &self.name).finish()
    }
}

/// Explicit caller context: the source location one frame above the wrapper
/// entry point. Captured via `#[track_caller]` at the public entry, or built
/// directly when a test needs a fixed site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
}

impl CallSite {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Capture the location of the caller. Propagates through any chain of
    /// `#[track_caller]` entry points, so the recorded site is the user's
    /// call, not a frame inside this crate.
    #[track_caller]
    pub fn here() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file().to_string(),
            line: location.line(),
        }
    }

    /// Absolute form of the source file path, used for cache-key derivation
    /// so the key does not depend on the working directory the process
    /// happened to start in. Falls back to the recorded path when the file
    /// cannot be resolved.
    pub fn absolute_file(&self) -> String {
        std::fs::canonicalize(&self.file)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| self.file.clone())
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file: {}, line: {}", self.file, self.line)
    }
}

/// Convenience error for callables validating their own inputs.
pub fn type_error(operation: &str, expected: &str, actual: &Value) -> EndowError {
    EndowError::TypeError {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
        operation: operation.to_string(),
    }
}
