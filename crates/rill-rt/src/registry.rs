//! The global registry of toplevel bindings.
//!
//! Embedders register builtins (and script toplevels land) here. The
//! table is keyed by root name; a dotted path like `error.raise`
//! rebuilds the root entry with the leaf spliced in, leaving sibling
//! fields intact. The table sits behind a mutex so registration can
//! happen from module initializers.

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use rill_typeck::{Scheme, TypeArena};

use crate::value::Value;

/// One registered binding: its generalized type and its value.
#[derive(Clone, Debug)]
pub struct Entry {
    pub scheme: Scheme,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RegistryError {
    /// The name (or dotted leaf) is already registered.
    Occupied(String),
    /// A dotted path names a parent that does not exist.
    MissingParent { path: String, segment: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Occupied(name) => {
                write!(f, "`{name}` is already registered")
            }
            RegistryError::MissingParent { path, segment } => {
                write!(f, "cannot register `{path}`: no parent `{segment}`")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Default)]
pub struct Registry {
    table: Mutex<FxHashMap<String, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a binding under `path`, failing if the leaf already
    /// exists. Dotted paths splice into the root entry.
    pub fn register(
        &self,
        arena: &mut TypeArena,
        path: &str,
        scheme: Scheme,
        value: Value,
    ) -> Result<(), RegistryError> {
        self.install(arena, path, scheme, value, false)
    }

    /// Register a binding, replacing any previous entry at the leaf.
    pub fn register_replace(
        &self,
        arena: &mut TypeArena,
        path: &str,
        scheme: Scheme,
        value: Value,
    ) -> Result<(), RegistryError> {
        self.install(arena, path, scheme, value, true)
    }

    /// Register an empty record as a namespace for later dotted
    /// registrations.
    pub fn register_module(
        &self,
        arena: &mut TypeArena,
        path: &str,
    ) -> Result<(), RegistryError> {
        let unit = arena.unit();
        self.install(arena, path, Scheme::mono(unit), Value::unit(), false)
    }

    pub fn lookup(&self, name: &str) -> Option<Entry> {
        self.table.lock().get(name).cloned()
    }

    /// All root entries, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Entry)> {
        let mut out: Vec<(String, Entry)> =
            self.table.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        out.sort_by(|(a, _), (b, _)| a.cmp(b));
        out
    }

    fn install(
        &self,
        arena: &mut TypeArena,
        path: &str,
        scheme: Scheme,
        value: Value,
        replace: bool,
    ) -> Result<(), RegistryError> {
        let segments: Vec<&str> = path.split('.').collect();
        let (root, rest) = segments.split_first().expect("empty registration path");
        let mut table = self.table.lock();

        if rest.is_empty() {
            if !replace && table.contains_key(*root) {
                return Err(RegistryError::Occupied(path.to_string()));
            }
            table.insert(root.to_string(), Entry { scheme, value });
            return Ok(());
        }

        let current = table.get(*root).ok_or_else(|| RegistryError::MissingParent {
            path: path.to_string(),
            segment: root.to_string(),
        })?;
        if !replace && resolve_leaf(&current.value, rest).is_some() {
            return Err(RegistryError::Occupied(path.to_string()));
        }
        let new_value = splice_value(&current.value, rest, value)
            .map_err(|segment| RegistryError::MissingParent { path: path.to_string(), segment })?;
        let new_ty = splice_ty(arena, current.scheme.ty, rest, scheme)
            .map_err(|segment| RegistryError::MissingParent { path: path.to_string(), segment })?;
        let vars = current.scheme.vars.clone();
        table.insert(root.to_string(), Entry {
            scheme: Scheme { vars, ty: new_ty },
            value: new_value,
        });
        Ok(())
    }
}

fn resolve_leaf<'v>(mut v: &'v Value, path: &[&str]) -> Option<&'v Value> {
    for segment in path {
        v = v.invoke_meth(segment)?;
    }
    Some(v)
}

/// Rebuild a record value along `path`, shadowing the leaf. Errors with
/// the missing segment when an intermediate is absent.
fn splice_value(root: &Value, path: &[&str], leaf: Value) -> Result<Value, String> {
    match path {
        [] => Ok(leaf),
        [field, rest @ ..] => {
            let value = if rest.is_empty() {
                leaf
            } else {
                let inner =
                    root.invoke_meth(field).ok_or_else(|| field.to_string())?;
                splice_value(inner, rest, leaf)?
            };
            Ok(Value::Meth {
                label: field.to_string(),
                value: Box::new(value),
                rest: Box::new(root.clone()),
            })
        }
    }
}

/// Mirror of [`splice_value`] on the type side: the root's row gains
/// (or shadows) the leaf field, keeping the quantified variables of the
/// root scheme.
fn splice_ty(
    arena: &mut TypeArena,
    root: rill_typeck::TypeId,
    path: &[&str],
    leaf: Scheme,
) -> Result<rill_typeck::TypeId, String> {
    match path {
        [] => Ok(leaf.ty),
        [field, rest @ ..] => {
            if rest.is_empty() {
                Ok(arena.meth(*field, leaf, "", None, root))
            } else {
                let inner = arena
                    .invoke_meth(root, field)
                    .ok_or_else(|| field.to_string())?;
                let rebuilt = splice_ty(arena, inner.ty, rest, leaf)?;
                Ok(arena.meth(*field, Scheme::mono(rebuilt), "", None, root))
            }
        }
    }
}
