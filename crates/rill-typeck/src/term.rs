//! The abstract syntax checked and evaluated by this crate.
//!
//! Parsing is out of scope: an embedder builds [`Term`] trees directly
//! (or from its own front end) and hands them to the checker. Each term
//! carries a type slot the checker fills in, so the evaluator can
//! consult resolved types without a separate annotation pass.

use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use rill_common::Span;

use crate::ty::TypeId;

/// A ground literal.
#[derive(Clone, Debug, PartialEq)]
pub enum GroundLit {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// An expression node: position, checker-filled type slot, and shape.
#[derive(Clone, Debug)]
pub struct Term {
    pub span: Option<Span>,
    /// Filled by the checker; the evaluator reads it to decide literal
    /// widening.
    pub ty: Cell<Option<TypeId>>,
    pub kind: TermKind,
}

#[derive(Clone, Debug)]
pub enum TermKind {
    Ground(GroundLit),
    List(Vec<Term>),
    Tuple(Vec<Term>),
    /// The null literal.
    Null,
    /// A type ascription: the term must check against the given type.
    Cast { term: Box<Term>, ty: TypeId },
    /// Attach a method to a value: `def.{label = ...}` stacked on
    /// `rest`.
    Meth { label: String, def: Box<Term>, rest: Box<Term> },
    /// Method invocation `obj.label`, optionally with a fallback value
    /// used when the object lacks the field.
    Invoke { obj: Box<Term>, label: String, default: Option<Box<Term>> },
    /// `open obj; body` -- the object's fields become variables inside
    /// `body`.
    Open { obj: Box<Term>, body: Box<Term> },
    Let(Box<LetDef>),
    Var(String),
    /// Strict sequencing; the left value is discarded.
    Seq(Box<Term>, Box<Term>),
    /// Application with labeled actuals; the empty label marks
    /// positional arguments.
    App { fun: Box<Term>, args: Vec<(String, Term)> },
    Fun(Rc<FunDef>),
    /// A recursive function: `self_name` is bound to the function
    /// itself inside the body.
    RFun { self_name: String, fun: Rc<FunDef> },
}

/// One `let` binding.
#[derive(Clone, Debug)]
pub struct LetDef {
    pub pat: Pattern,
    pub def: Term,
    pub body: Term,
    /// Set by the checker when the definition passed the value
    /// restriction and was generalized; toplevel registration
    /// re-generalizes accordingly.
    pub generalized: Cell<bool>,
}

/// A function definition shared between the term that introduced it and
/// any closure values built from it.
#[derive(Debug)]
pub struct FunDef {
    pub params: Vec<FunParam>,
    pub body: Term,
    /// Free variables of the body minus the parameters, computed once
    /// on first use. Closure capture snapshots exactly these names.
    free: OnceCell<Vec<String>>,
}

/// One formal parameter.
#[derive(Clone, Debug)]
pub struct FunParam {
    /// Call-site label; empty for positional parameters.
    pub label: String,
    /// The name the parameter binds inside the body.
    pub name: String,
    /// Optional annotation.
    pub ty: Option<TypeId>,
    /// Default value; its presence makes the parameter optional.
    pub default: Option<Term>,
    pub span: Option<Span>,
}

/// A binding pattern on the left of `let`.
#[derive(Clone, Debug)]
pub struct Pattern {
    pub span: Option<Span>,
    pub kind: PatternKind,
}

#[derive(Clone, Debug)]
pub enum PatternKind {
    /// A dotted path; `["a"]` binds `a`, `["a", "b"]` rebinds `a` with
    /// field `b` replaced.
    Var(Vec<String>),
    Tuple(Vec<Pattern>),
    /// `[x, y, ...rest, z]`; the spread, when present, captures the
    /// middle as a list.
    List { before: Vec<Pattern>, spread: Option<String>, after: Vec<Pattern> },
    /// `{a, b}` or `base.{a, b}`; fields are bound by name and `base`
    /// receives the value with those fields hidden.
    Meth { base: Option<Box<Pattern>>, fields: Vec<String> },
}

impl Pattern {
    pub fn var(name: impl Into<String>) -> Pattern {
        Pattern { span: None, kind: PatternKind::Var(vec![name.into()]) }
    }

    pub fn path(segments: Vec<String>) -> Pattern {
        Pattern { span: None, kind: PatternKind::Var(segments) }
    }

    pub fn tuple(elems: Vec<Pattern>) -> Pattern {
        Pattern { span: None, kind: PatternKind::Tuple(elems) }
    }

    /// All names this pattern introduces into scope.
    pub fn bound_names(&self, out: &mut Vec<String>) {
        match &self.kind {
            PatternKind::Var(path) => {
                if let Some(root) = path.first() {
                    out.push(root.clone());
                }
            }
            PatternKind::Tuple(elems) => {
                for p in elems {
                    p.bound_names(out);
                }
            }
            PatternKind::List { before, spread, after } => {
                for p in before.iter().chain(after.iter()) {
                    p.bound_names(out);
                }
                if let Some(s) = spread {
                    out.push(s.clone());
                }
            }
            PatternKind::Meth { base, fields } => {
                for f in fields {
                    out.push(f.clone());
                }
                if let Some(b) = base {
                    b.bound_names(out);
                }
            }
        }
    }

    /// Names the pattern reads before rebinding: a dotted path updates
    /// an existing value, so its root is a use as well as a binding.
    fn used_roots(&self, out: &mut Vec<String>) {
        match &self.kind {
            PatternKind::Var(path) => {
                if path.len() > 1 {
                    if let Some(root) = path.first() {
                        out.push(root.clone());
                    }
                }
            }
            PatternKind::Tuple(elems) => {
                for p in elems {
                    p.used_roots(out);
                }
            }
            PatternKind::List { before, after, .. } => {
                for p in before.iter().chain(after.iter()) {
                    p.used_roots(out);
                }
            }
            PatternKind::Meth { base, .. } => {
                if let Some(b) = base {
                    b.used_roots(out);
                }
            }
        }
    }
}

impl FunDef {
    pub fn new(params: Vec<FunParam>, body: Term) -> Self {
        FunDef { params, body, free: OnceCell::new() }
    }

    /// The free variables of the body, parameters excluded, in order of
    /// first occurrence.
    pub fn free_vars(&self) -> &[String] {
        self.free.get_or_init(|| {
            let mut bound: Vec<String> =
                self.params.iter().map(|p| p.name.clone()).collect();
            let mut out = Vec::new();
            // Defaults evaluate outside the body scope.
            for p in &self.params {
                if let Some(d) = &p.default {
                    collect_free(d, &mut Vec::new(), &mut out);
                }
            }
            collect_free(&self.body, &mut bound, &mut out);
            out
        })
    }
}

fn note_use(name: &str, bound: &[String], out: &mut Vec<String>) {
    if !bound.iter().any(|b| b == name) && !out.iter().any(|o| o == name) {
        out.push(name.to_string());
    }
}

fn collect_free(term: &Term, bound: &mut Vec<String>, out: &mut Vec<String>) {
    match &term.kind {
        TermKind::Ground(_) | TermKind::Null => {}
        TermKind::Var(name) => note_use(name, bound, out),
        TermKind::List(items) | TermKind::Tuple(items) => {
            for t in items {
                collect_free(t, bound, out);
            }
        }
        TermKind::Cast { term, .. } => collect_free(term, bound, out),
        TermKind::Meth { def, rest, .. } => {
            collect_free(def, bound, out);
            collect_free(rest, bound, out);
        }
        TermKind::Invoke { obj, default, .. } => {
            collect_free(obj, bound, out);
            if let Some(d) = default {
                collect_free(d, bound, out);
            }
        }
        TermKind::Open { obj, body } => {
            collect_free(obj, bound, out);
            // Field names shadow dynamically; the static walk stays
            // conservative and treats the body scope as unchanged.
            collect_free(body, bound, out);
        }
        TermKind::Let(ld) => {
            collect_free(&ld.def, bound, out);
            let mut used = Vec::new();
            ld.pat.used_roots(&mut used);
            for name in used {
                note_use(&name, bound, out);
            }
            let before = bound.len();
            ld.pat.bound_names(bound);
            collect_free(&ld.body, bound, out);
            bound.truncate(before);
        }
        TermKind::Seq(a, b) => {
            collect_free(a, bound, out);
            collect_free(b, bound, out);
        }
        TermKind::App { fun, args } => {
            collect_free(fun, bound, out);
            for (_, t) in args {
                collect_free(t, bound, out);
            }
        }
        TermKind::Fun(def) => {
            for name in def.free_vars() {
                note_use(name, bound, out);
            }
        }
        TermKind::RFun { self_name, fun } => {
            for name in fun.free_vars() {
                if name != self_name {
                    note_use(name, bound, out);
                }
            }
        }
    }
}

impl Term {
    pub fn new(kind: TermKind) -> Term {
        Term { span: None, ty: Cell::new(None), kind }
    }

    pub fn at(kind: TermKind, span: Span) -> Term {
        Term { span: Some(span), ty: Cell::new(None), kind }
    }

    // ── Construction helpers ────────────────────────────────────────

    pub fn bool_(b: bool) -> Term {
        Term::new(TermKind::Ground(GroundLit::Bool(b)))
    }

    pub fn int(i: i64) -> Term {
        Term::new(TermKind::Ground(GroundLit::Int(i)))
    }

    pub fn float(x: f64) -> Term {
        Term::new(TermKind::Ground(GroundLit::Float(x)))
    }

    pub fn string(s: impl Into<String>) -> Term {
        Term::new(TermKind::Ground(GroundLit::String(s.into())))
    }

    pub fn var(name: impl Into<String>) -> Term {
        Term::new(TermKind::Var(name.into()))
    }

    pub fn unit() -> Term {
        Term::new(TermKind::Tuple(Vec::new()))
    }

    pub fn null() -> Term {
        Term::new(TermKind::Null)
    }

    pub fn list(items: Vec<Term>) -> Term {
        Term::new(TermKind::List(items))
    }

    pub fn tuple(items: Vec<Term>) -> Term {
        Term::new(TermKind::Tuple(items))
    }

    pub fn seq(a: Term, b: Term) -> Term {
        Term::new(TermKind::Seq(Box::new(a), Box::new(b)))
    }

    pub fn let_(name: impl Into<String>, def: Term, body: Term) -> Term {
        Term::let_pat(Pattern::var(name), def, body)
    }

    pub fn let_pat(pat: Pattern, def: Term, body: Term) -> Term {
        Term::new(TermKind::Let(Box::new(LetDef {
            pat,
            def,
            body,
            generalized: Cell::new(false),
        })))
    }

    pub fn app(fun: Term, args: Vec<(&str, Term)>) -> Term {
        Term::new(TermKind::App {
            fun: Box::new(fun),
            args: args.into_iter().map(|(l, t)| (l.to_string(), t)).collect(),
        })
    }

    pub fn fun(params: Vec<FunParam>, body: Term) -> Term {
        Term::new(TermKind::Fun(Rc::new(FunDef::new(params, body))))
    }

    pub fn rfun(self_name: impl Into<String>, params: Vec<FunParam>, body: Term) -> Term {
        Term::new(TermKind::RFun {
            self_name: self_name.into(),
            fun: Rc::new(FunDef::new(params, body)),
        })
    }

    pub fn meth(label: impl Into<String>, def: Term, rest: Term) -> Term {
        Term::new(TermKind::Meth {
            label: label.into(),
            def: Box::new(def),
            rest: Box::new(rest),
        })
    }

    /// A record literal `{l1 = d1, l2 = d2, ...}` over unit. Entries
    /// are stacked in source order, so a repeated label shadows the
    /// earlier entry without deleting it.
    pub fn record(fields: Vec<(&str, Term)>) -> Term {
        let mut t = Term::unit();
        for (label, def) in fields {
            t = Term::meth(label, def, t);
        }
        t
    }

    pub fn invoke(obj: Term, label: impl Into<String>) -> Term {
        Term::new(TermKind::Invoke { obj: Box::new(obj), label: label.into(), default: None })
    }

    pub fn invoke_default(obj: Term, label: impl Into<String>, default: Term) -> Term {
        Term::new(TermKind::Invoke {
            obj: Box::new(obj),
            label: label.into(),
            default: Some(Box::new(default)),
        })
    }

    pub fn open(obj: Term, body: Term) -> Term {
        Term::new(TermKind::Open { obj: Box::new(obj), body: Box::new(body) })
    }

    pub fn cast(term: Term, ty: TypeId) -> Term {
        Term::new(TermKind::Cast { term: Box::new(term), ty })
    }
}

impl FunParam {
    pub fn positional(name: impl Into<String>) -> FunParam {
        let name = name.into();
        FunParam { label: String::new(), name, ty: None, default: None, span: None }
    }

    pub fn labeled(label: impl Into<String>) -> FunParam {
        let label = label.into();
        FunParam { label: label.clone(), name: label, ty: None, default: None, span: None }
    }

    pub fn with_default(mut self, def: Term) -> FunParam {
        self.default = Some(def);
        self
    }

    pub fn with_ty(mut self, ty: TypeId) -> FunParam {
        self.ty = Some(ty);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_vars_exclude_params_and_lets() {
        // fun (x) -> let y = x + outer in y
        let body = Term::let_(
            "y",
            Term::app(Term::var("add"), vec![("", Term::var("x")), ("", Term::var("outer"))]),
            Term::var("y"),
        );
        let def = FunDef::new(vec![FunParam::positional("x")], body);
        assert_eq!(def.free_vars(), ["add", "outer"]);
    }

    #[test]
    fn free_vars_of_nested_function_propagate() {
        // fun () -> fun () -> captured
        let inner = Term::fun(vec![], Term::var("captured"));
        let def = FunDef::new(vec![], inner);
        assert_eq!(def.free_vars(), ["captured"]);
    }

    #[test]
    fn recursive_function_does_not_capture_itself() {
        let body = Term::app(Term::var("loop"), vec![("", Term::var("n"))]);
        let rfun = Term::rfun("loop", vec![FunParam::positional("n")], body);
        let TermKind::RFun { fun, .. } = &rfun.kind else { unreachable!() };
        let mut bound = Vec::new();
        let mut out = Vec::new();
        collect_free(&rfun, &mut bound, &mut out);
        assert!(fun.free_vars().contains(&"loop".to_string()));
        assert_eq!(out, Vec::<String>::new());
    }

    #[test]
    fn dotted_let_pattern_reads_its_root() {
        // let a.b = 1 in () -- `a` is consumed to build the new record.
        let t = Term::let_pat(
            Pattern::path(vec!["a".into(), "b".into()]),
            Term::int(1),
            Term::unit(),
        );
        let def = FunDef::new(vec![], t);
        assert_eq!(def.free_vars(), ["a"]);
    }
}
