//! The typing environment: a stack of lexical scopes.
//!
//! Scopes are ordered vectors rather than hash maps so the unused-
//! variable lint reports names in declaration order. Lookup walks
//! innermost-out and later entries in a scope shadow earlier ones.

use std::cell::Cell;

use rill_common::Span;

use crate::ty::Scheme;

/// One binding: its scheme plus lint bookkeeping.
pub struct EnvEntry {
    pub scheme: Scheme,
    pub span: Option<Span>,
    used: Cell<bool>,
    /// Bindings introduced implicitly (opened fields, recursive self
    /// names) never trigger the unused lint.
    lint_exempt: bool,
}

/// The environment. Construction installs the global scope, which is
/// never popped.
pub struct TypeEnv {
    scopes: Vec<Vec<(String, EnvEntry)>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv { scopes: vec![Vec::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Pop the current scope, returning the never-read bindings in
    /// declaration order. Names starting with `_` and exempt entries
    /// are skipped.
    ///
    /// # Panics
    ///
    /// Panics on an attempt to pop the global scope.
    pub fn pop_scope(&mut self) -> Vec<(String, Option<Span>)> {
        assert!(self.scopes.len() > 1, "popped the global scope");
        let scope = self.scopes.pop().unwrap();
        scope
            .into_iter()
            .filter(|(name, e)| !e.used.get() && !e.lint_exempt && !name.starts_with('_'))
            .map(|(name, e)| (name, e.span))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, scheme: Scheme, span: Option<Span>) {
        self.insert_entry(name.into(), scheme, span, false);
    }

    /// Insert a binding exempt from the unused lint.
    pub fn insert_exempt(&mut self, name: impl Into<String>, scheme: Scheme, span: Option<Span>) {
        self.insert_entry(name.into(), scheme, span, true);
    }

    fn insert_entry(&mut self, name: String, scheme: Scheme, span: Option<Span>, exempt: bool) {
        let entry = EnvEntry { scheme, span, used: Cell::new(false), lint_exempt: exempt };
        self.scopes.last_mut().unwrap().push((name, entry));
    }

    /// Look a name up, innermost scope first, marking it used.
    pub fn lookup(&self, name: &str) -> Option<&Scheme> {
        for scope in self.scopes.iter().rev() {
            // Later entries shadow earlier ones.
            if let Some((_, e)) = scope.iter().rev().find(|(n, _)| n == name) {
                e.used.set(true);
                return Some(&e.scheme);
            }
        }
        None
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeArena;

    #[test]
    fn lookup_marks_used_and_shadows() {
        let mut arena = TypeArena::new();
        let i = arena.int();
        let s = arena.string();
        let mut env = TypeEnv::new();
        env.push_scope();
        env.insert("x", Scheme::mono(i), None);
        env.insert("x", Scheme::mono(s), None);
        let found = env.lookup("x").unwrap();
        assert_eq!(found.ty, s);
        let unused = env.pop_scope();
        // The shadowed first `x` was never read.
        assert_eq!(unused.len(), 1);
    }

    #[test]
    fn underscore_and_exempt_names_never_reported() {
        let mut arena = TypeArena::new();
        let i = arena.int();
        let mut env = TypeEnv::new();
        env.push_scope();
        env.insert("_scratch", Scheme::mono(i), None);
        env.insert_exempt("self", Scheme::mono(i), None);
        env.insert("real", Scheme::mono(i), None);
        let unused = env.pop_scope();
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].0, "real");
    }

    #[test]
    fn inner_scope_sees_outer_bindings() {
        let mut arena = TypeArena::new();
        let i = arena.int();
        let mut env = TypeEnv::new();
        env.insert("global", Scheme::mono(i), None);
        env.push_scope();
        assert!(env.lookup("global").is_some());
        env.pop_scope();
        assert!(env.lookup("global").is_some());
    }
}
