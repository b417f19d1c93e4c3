//! Runtime for the rill language.
//!
//! The pieces:
//!
//! - [`value`]: runtime values, including closures, native builtins and
//!   opaque external objects.
//! - [`eval`]: the strict call-by-value evaluator.
//! - [`error`]: catchable runtime errors.
//! - [`registry`]: the mutex-guarded table of toplevel bindings.
//! - [`stdlib`]: the bootstrap builtins.
//!
//! [`Session`] ties them together: it owns the type arena and registry,
//! checks terms against the registered schemes, evaluates them, and
//! publishes toplevel `let`s back into the registry.

pub mod error;
pub mod eval;
pub mod registry;
pub mod stdlib;
pub mod value;

use std::fmt;

use rill_typeck::term::{PatternKind, Term, TermKind};
use rill_typeck::{
    check, CheckOptions, CheckOutput, Scheme, TypeArena, TypeEnv, TypeError, TypeId,
    TypeWarning, Unifier,
};

pub use crate::error::{RuntimeError, RuntimeResult};
pub use crate::eval::Evaluator;
pub use crate::registry::{Entry, Registry, RegistryError};
pub use crate::value::{ExternalValue, FfiParam, FfiValue, GroundVal, Value};

/// Anything that can go wrong while running a term end to end.
#[derive(Debug)]
pub enum SessionError {
    Type(TypeError),
    Runtime(RuntimeError),
    Registry(RegistryError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Type(e) => write!(f, "{e}"),
            SessionError::Runtime(e) => write!(f, "{e}"),
            SessionError::Registry(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<TypeError> for SessionError {
    fn from(e: TypeError) -> Self {
        SessionError::Type(e)
    }
}

impl From<RuntimeError> for SessionError {
    fn from(e: RuntimeError) -> Self {
        SessionError::Runtime(e)
    }
}

impl From<RegistryError> for SessionError {
    fn from(e: RegistryError) -> Self {
        SessionError::Registry(e)
    }
}

/// The result of running a term: its value, its resolved type, and any
/// lint warnings from the checking pass.
pub struct RunOutput {
    pub value: Value,
    pub ty: TypeId,
    pub warnings: Vec<TypeWarning>,
}

/// An embedding session: one arena, one registry, one set of options.
pub struct Session {
    pub arena: TypeArena,
    pub registry: Registry,
    pub opts: CheckOptions,
}

impl Session {
    /// A session with the bootstrap stdlib installed.
    pub fn new() -> Result<Session, SessionError> {
        let mut session = Session::bare();
        stdlib::install(&mut session.arena, &session.registry)?;
        Ok(session)
    }

    /// A session with an empty registry.
    pub fn bare() -> Session {
        Session {
            arena: TypeArena::new(),
            registry: Registry::new(),
            opts: CheckOptions::default(),
        }
    }

    /// Check a term against the registered bindings.
    pub fn check(&mut self, term: &Term) -> Result<CheckOutput, SessionError> {
        let mut env = TypeEnv::new();
        for (name, entry) in self.registry.bindings() {
            env.insert_exempt(name, entry.scheme, None);
        }
        Ok(check(&mut self.arena, &mut env, term, self.opts)?)
    }

    /// Evaluate an already-checked term. The environment starts from
    /// the registered values.
    pub fn eval(&mut self, term: &Term) -> Result<Value, SessionError> {
        let mut ev = Evaluator::with_env(&self.arena, self.seed_values());
        Ok(ev.eval(term)?)
    }

    /// Check and evaluate, publishing toplevel `let`s into the
    /// registry so later runs in the same session see them.
    pub fn run(&mut self, term: &Term) -> Result<RunOutput, SessionError> {
        let checked = self.check(term)?;
        let value = self.eval_toplevel(term)?;
        Ok(RunOutput { value, ty: checked.ty, warnings: checked.warnings })
    }

    fn seed_values(&self) -> Vec<(String, Value)> {
        self.registry
            .bindings()
            .into_iter()
            .map(|(name, entry)| (name, entry.value))
            .collect()
    }

    /// Walk the toplevel `let` spine: each simple or dotted binding is
    /// evaluated and queued for registration, destructuring bindings
    /// stay local to the run.
    fn eval_toplevel(&mut self, term: &Term) -> Result<Value, SessionError> {
        // (dotted path, resolved type, generalized?, value)
        let mut published: Vec<(String, Option<TypeId>, bool, Value)> = Vec::new();
        let value = {
            let mut ev = Evaluator::with_env(&self.arena, self.seed_values());
            let mut t = term;
            loop {
                match &t.kind {
                    TermKind::Let(ld) => {
                        let v = ev.eval(&ld.def)?;
                        if let PatternKind::Var(path) = &ld.pat.kind {
                            published.push((
                                path.join("."),
                                ld.def.ty.get(),
                                ld.generalized.get(),
                                v.clone(),
                            ));
                        }
                        ev.bind_pattern(&ld.pat, v)?;
                        t = &ld.body;
                    }
                    TermKind::Seq(a, b) => {
                        ev.eval(a)?;
                        t = b;
                    }
                    _ => break ev.eval(t)?,
                }
            }
        };
        for (path, ty, generalized, v) in published {
            let scheme = match ty {
                Some(ty) if generalized => {
                    Unifier::new(&mut self.arena).generalize(0, ty)
                }
                Some(ty) => Scheme::mono(ty),
                // The checker always fills the slot; a missing type
                // only happens for terms checked elsewhere.
                None => continue,
            };
            self.registry.register_replace(&mut self.arena, &path, scheme, v)?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toplevel_lets_persist_across_runs() {
        let mut session = Session::new().unwrap();
        let t = Term::let_("greeting", Term::string("hi"), Term::unit());
        session.run(&t).unwrap();
        let out = session.run(&Term::var("greeting")).unwrap();
        assert_eq!(out.value.to_string(), "\"hi\"");
    }

    #[test]
    fn type_errors_surface_before_evaluation() {
        let mut session = Session::new().unwrap();
        let t = Term::app(Term::var("add"), vec![("", Term::int(1)), ("", Term::bool_(true))]);
        assert!(matches!(session.run(&t), Err(SessionError::Type(_))));
    }
}
