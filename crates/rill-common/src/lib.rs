//! Shared leaf types for the rill language core.
//!
//! The rill core consumes an already-parsed term AST from an external
//! parser; this crate holds the few types both sides of that boundary
//! need, most importantly source [`span::Span`]s.

pub mod span;

pub use span::Span;
