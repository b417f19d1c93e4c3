//! Rill type system core: structural subtyping with rows and levels.
//!
//! This crate implements the static half of the rill scripting language:
//! a Hindley-Milner checker extended with structural subtyping by
//! controlled mutation, row-polymorphic method types, nullable and
//! getter types, and labeled/optional function parameters.
//!
//! # Architecture
//!
//! - [`ty`]: Arena-based type graph (descriptors, variable cells, rows)
//! - [`pretty`]: Stable textual notation and error representations
//! - [`unify`]: Subtyping engine, joins, generalization/instantiation
//! - [`term`]: The checked AST with type slots and patterns
//! - [`env`]: Scoped typing environment with usage tracking
//! - [`infer`]: The checking driver
//! - [`builtins`]: Schemes for the bootstrap builtins
//! - [`error`], [`diagnostics`]: Error taxonomy and ariadne rendering

pub mod builtins;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod infer;
pub mod pretty;
pub mod term;
pub mod ty;
pub mod unify;

pub use diagnostics::{diagnostic, render_diagnostic, render_warning, DiagnosticOptions};
pub use env::TypeEnv;
pub use error::{TypeError, TypeWarning};
pub use infer::{check, value_restriction, CheckOptions, CheckOutput};
pub use pretty::{print_scheme, print_type};
pub use term::{FunDef, FunParam, GroundLit, Pattern, PatternKind, Term, TermKind};
pub use ty::{
    Constraint, GroundTag, Param, Scheme, TyDescr, TypeArena, TypeId, VarId, Variance,
};
pub use unify::{Policy, Unifier};
