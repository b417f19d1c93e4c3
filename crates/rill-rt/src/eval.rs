//! The strict call-by-value evaluator.
//!
//! Works over already-checked terms: the checker has filled the type
//! slots (consulted for integer-literal widening) and fixed each
//! function's free-variable list (consulted for closure capture). The
//! environment is a flat scope vector; frames are truncated on exit and
//! closure calls swap in the captured frame wholesale.

use std::rc::Rc;

use rill_typeck::term::{Pattern, PatternKind, Term, TermKind};
use rill_typeck::{FunParam, GroundLit, GroundTag, TyDescr, TypeArena};

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{FunValue, Value};

pub struct Evaluator<'a> {
    arena: &'a TypeArena,
    env: Vec<(String, Value)>,
}

impl<'a> Evaluator<'a> {
    pub fn new(arena: &'a TypeArena) -> Self {
        Evaluator { arena, env: Vec::new() }
    }

    pub fn with_env(arena: &'a TypeArena, env: Vec<(String, Value)>) -> Self {
        Evaluator { arena, env }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.env.push((name.into(), value));
    }

    pub fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        self.env
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| RuntimeError::not_found(format!("unbound variable `{name}`")))
    }

    pub fn eval(&mut self, term: &Term) -> RuntimeResult<Value> {
        self.eval_kind(term).map_err(|e| e.with_pos(term.span))
    }

    fn eval_kind(&mut self, term: &Term) -> RuntimeResult<Value> {
        match &term.kind {
            TermKind::Ground(GroundLit::Bool(b)) => Ok(Value::bool_(*b)),
            TermKind::Ground(GroundLit::Int(i)) => Ok(self.int_literal(term, *i)),
            TermKind::Ground(GroundLit::Float(x)) => Ok(Value::float(*x)),
            TermKind::Ground(GroundLit::String(s)) => Ok(Value::string(s.clone())),
            TermKind::Null => Ok(Value::Null),

            TermKind::List(items) => {
                let mut vs = Vec::with_capacity(items.len());
                for item in items {
                    vs.push(self.eval(item)?);
                }
                Ok(Value::List(vs))
            }
            TermKind::Tuple(items) => {
                let mut vs = Vec::with_capacity(items.len());
                for item in items {
                    vs.push(self.eval(item)?);
                }
                Ok(Value::Tuple(vs))
            }

            TermKind::Cast { term: inner, .. } => self.eval(inner),

            TermKind::Meth { label, def, rest } => {
                let value = self.eval(def)?;
                let rest = self.eval(rest)?;
                Ok(Value::Meth {
                    label: label.clone(),
                    value: Box::new(value),
                    rest: Box::new(rest),
                })
            }

            TermKind::Invoke { obj, label, default } => {
                let v = self.eval(obj)?;
                match v.invoke_meth(label) {
                    Some(found) => Ok(found.clone()),
                    None => match default {
                        Some(d) => self.eval(d),
                        None => Err(RuntimeError::not_found(format!(
                            "value {v} has no method `{label}`"
                        ))),
                    },
                }
            }

            TermKind::Open { obj, body } => {
                let v = self.eval(obj)?;
                let base = self.env.len();
                let (entries, _) = v.split_meths();
                // Front entries shadow; push them last.
                for (label, value) in entries.iter().rev() {
                    self.env.push((label.to_string(), (*value).clone()));
                }
                let out = self.eval(body);
                self.env.truncate(base);
                out
            }

            TermKind::Let(ld) => {
                let v = self.eval(&ld.def)?;
                let base = self.env.len();
                self.bind_pattern(&ld.pat, v)?;
                let out = self.eval(&ld.body);
                self.env.truncate(base);
                out
            }

            TermKind::Var(name) => self.lookup(name),

            TermKind::Seq(a, b) => {
                self.eval(a)?;
                self.eval(b)
            }

            TermKind::App { fun, args } => {
                let f = self.eval(fun)?;
                let mut actuals = Vec::with_capacity(args.len());
                for (label, arg) in args {
                    actuals.push((label.clone(), self.eval(arg)?));
                }
                self.apply(f, actuals)
            }

            TermKind::Fun(def) => {
                let env = self.capture(def.free_vars())?;
                Ok(Value::Fun(Rc::new(FunValue {
                    def: def.clone(),
                    env,
                    applied: Vec::new(),
                    self_name: None,
                })))
            }
            TermKind::RFun { self_name, fun } => {
                let names: Vec<&String> =
                    fun.free_vars().iter().filter(|n| *n != self_name).collect();
                let mut env = Vec::with_capacity(names.len());
                for n in names {
                    env.push((n.clone(), self.lookup(n)?));
                }
                Ok(Value::Fun(Rc::new(FunValue {
                    def: fun.clone(),
                    env,
                    applied: Vec::new(),
                    self_name: Some(self_name.clone()),
                })))
            }
        }
    }

    /// An integer literal whose checked type resolved to float was
    /// widened by context; produce the float directly.
    fn int_literal(&self, term: &Term, i: i64) -> Value {
        if let Some(t) = term.ty.get() {
            let t = self.arena.deref(t);
            if matches!(self.arena.descr(t), TyDescr::Ground(GroundTag::Float)) {
                return Value::float(i as f64);
            }
        }
        Value::int(i)
    }

    fn capture(&self, names: &[String]) -> RuntimeResult<Vec<(String, Value)>> {
        let mut env = Vec::with_capacity(names.len());
        for n in names {
            env.push((n.clone(), self.lookup(n)?));
        }
        Ok(env)
    }

    // ── Application ─────────────────────────────────────────────────

    /// Apply a callable to labeled arguments. Returns a partial closure
    /// while mandatory formals remain unsupplied.
    pub fn apply(&mut self, f: Value, args: Vec<(String, Value)>) -> RuntimeResult<Value> {
        match f.demeth() {
            Value::Fun(rc) => {
                let mut applied = rc.applied.clone();
                applied.extend(args);
                let satisfied = labels_satisfied(
                    rc.def.params.iter().map(|p| (p.label.as_str(), p.default.is_some())),
                    &applied,
                );
                if satisfied {
                    self.call_fun(rc, applied)
                } else {
                    Ok(Value::Fun(Rc::new(FunValue {
                        def: rc.def.clone(),
                        env: rc.env.clone(),
                        applied,
                        self_name: rc.self_name.clone(),
                    })))
                }
            }
            Value::Ffi(rc) => {
                let mut applied = rc.applied.clone();
                applied.extend(args);
                let satisfied = labels_satisfied(
                    rc.params.iter().map(|p| (p.label.as_str(), p.default.is_some())),
                    &applied,
                );
                if satisfied {
                    self.call_ffi(rc, applied)
                } else {
                    Ok(Value::Ffi(Rc::new(crate::value::FfiValue {
                        name: rc.name.clone(),
                        params: rc.params.clone(),
                        applied,
                        call: rc.call.clone(),
                    })))
                }
            }
            other => Err(RuntimeError::type_error(format!("{other} is not a function"))),
        }
    }

    /// Run a closure body in its captured frame, binding formals in
    /// order and evaluating defaults left to right.
    fn call_fun(
        &mut self,
        rc: &Rc<FunValue>,
        mut remaining: Vec<(String, Value)>,
    ) -> RuntimeResult<Value> {
        let mut frame = rc.env.clone();
        if let Some(name) = &rc.self_name {
            frame.push((name.clone(), Value::Fun(rc.clone())));
        }
        let saved = std::mem::replace(&mut self.env, frame);
        let out = self.bind_formals_and_run(&rc.def.params, &rc.def.body, &mut remaining);
        self.env = saved;
        out
    }

    fn bind_formals_and_run(
        &mut self,
        params: &[FunParam],
        body: &Term,
        remaining: &mut Vec<(String, Value)>,
    ) -> RuntimeResult<Value> {
        for p in params {
            let v = match remaining.iter().position(|(l, _)| l == &p.label) {
                Some(i) => remaining.remove(i).1,
                None => match &p.default {
                    Some(d) => self.eval(d)?,
                    None => {
                        return Err(RuntimeError::type_error(format!(
                            "missing argument `{}`",
                            display_label(&p.label)
                        )))
                    }
                },
            };
            self.env.push((p.name.clone(), v));
        }
        self.eval(body)
    }

    fn call_ffi(
        &mut self,
        rc: &Rc<crate::value::FfiValue>,
        mut remaining: Vec<(String, Value)>,
    ) -> RuntimeResult<Value> {
        let mut ordered = Vec::with_capacity(rc.params.len());
        for p in &rc.params {
            let v = match remaining.iter().position(|(l, _)| l == &p.label) {
                Some(i) => remaining.remove(i).1,
                None => match &p.default {
                    Some(d) => d.clone(),
                    None => {
                        return Err(RuntimeError::type_error(format!(
                            "missing argument `{}` to {}",
                            display_label(&p.label),
                            rc.name
                        )))
                    }
                },
            };
            ordered.push((p.label.clone(), v));
        }
        (*rc.call)(self, ordered)
    }

    // ── Pattern binding ─────────────────────────────────────────────

    pub fn bind_pattern(&mut self, pat: &Pattern, v: Value) -> RuntimeResult<()> {
        match &pat.kind {
            PatternKind::Var(path) => match path.as_slice() {
                [] => Ok(()),
                [name] => {
                    self.env.push((name.clone(), v));
                    Ok(())
                }
                [root, rest @ ..] => {
                    let rootv = self.lookup(root)?;
                    let rebuilt = splice_value(&rootv, rest, v)?;
                    self.env.push((root.clone(), rebuilt));
                    Ok(())
                }
            },
            PatternKind::Tuple(pats) => match v.demeth() {
                Value::Tuple(vs) if vs.len() == pats.len() => {
                    let vs = vs.clone();
                    for (p, x) in pats.iter().zip(vs) {
                        self.bind_pattern(p, x)?;
                    }
                    Ok(())
                }
                other => Err(RuntimeError::type_error(format!(
                    "cannot destructure {other} as a tuple"
                ))),
            },
            PatternKind::List { before, spread, after } => match v.demeth() {
                Value::List(vs) => {
                    if vs.len() < before.len() + after.len() {
                        return Err(RuntimeError::not_found(format!(
                            "list of length {} does not match the pattern",
                            vs.len()
                        )));
                    }
                    let vs = vs.clone();
                    let after_start = vs.len() - after.len();
                    for (p, x) in before.iter().zip(&vs[..before.len()]) {
                        self.bind_pattern(p, x.clone())?;
                    }
                    if let Some(name) = spread {
                        let middle = vs[before.len()..after_start].to_vec();
                        self.env.push((name.clone(), Value::List(middle)));
                    }
                    for (p, x) in after.iter().zip(&vs[after_start..]) {
                        self.bind_pattern(p, x.clone())?;
                    }
                    Ok(())
                }
                other => Err(RuntimeError::type_error(format!(
                    "cannot destructure {other} as a list"
                ))),
            },
            PatternKind::Meth { base, fields } => {
                for f in fields {
                    let fv = v.invoke_meth(f).cloned().ok_or_else(|| {
                        RuntimeError::not_found(format!("value has no method `{f}`"))
                    })?;
                    self.env.push((f.clone(), fv));
                }
                if let Some(bp) = base {
                    let mut rest = v.clone();
                    for f in fields {
                        rest = rest.hide_meth(f);
                    }
                    self.bind_pattern(bp, rest)?;
                }
                Ok(())
            }
        }
    }
}

fn display_label(label: &str) -> String {
    if label.is_empty() {
        "<positional>".to_string()
    } else {
        format!("~{label}")
    }
}

/// Whether every mandatory formal has a matching applied argument, each
/// argument consumed at most once.
fn labels_satisfied<'p>(
    params: impl Iterator<Item = (&'p str, bool)>,
    applied: &[(String, Value)],
) -> bool {
    let mut used = vec![false; applied.len()];
    for (label, optional) in params {
        let mut found = false;
        for (i, (l, _)) in applied.iter().enumerate() {
            if !used[i] && l == label {
                used[i] = true;
                found = true;
                break;
            }
        }
        if !found && !optional {
            return false;
        }
    }
    true
}

/// Rebuild a record along a dotted path, shadowing the leaf field.
fn splice_value(root: &Value, path: &[String], leaf: Value) -> RuntimeResult<Value> {
    match path {
        [] => Ok(leaf),
        [field, rest @ ..] => {
            let value = if rest.is_empty() {
                leaf
            } else {
                let inner = root.invoke_meth(field).cloned().ok_or_else(|| {
                    RuntimeError::not_found(format!("value has no method `{field}`"))
                })?;
                splice_value(&inner, rest, leaf)?
            };
            Ok(Value::Meth {
                label: field.clone(),
                value: Box::new(value),
                rest: Box::new(root.clone()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_typeck::Term;

    fn eval_closed(term: &Term) -> RuntimeResult<Value> {
        let arena = TypeArena::new();
        let mut ev = Evaluator::new(&arena);
        ev.eval(term)
    }

    #[test]
    fn let_and_var() {
        let t = Term::let_("x", Term::string("hi"), Term::var("x"));
        assert_eq!(eval_closed(&t).unwrap().to_string(), "\"hi\"");
    }

    #[test]
    fn closure_captures_creation_environment() {
        // let x = 1 in let f = fun () -> x in let x = 2 in f()
        let t = Term::let_(
            "x",
            Term::int(1),
            Term::let_(
                "f",
                Term::fun(vec![], Term::var("x")),
                Term::let_("x", Term::int(2), Term::app(Term::var("f"), vec![])),
            ),
        );
        assert_eq!(eval_closed(&t).unwrap().to_string(), "1");
    }

    #[test]
    fn seq_discards_left() {
        let t = Term::seq(Term::string("dropped"), Term::int(7));
        assert_eq!(eval_closed(&t).unwrap().to_string(), "7");
    }

    #[test]
    fn error_positions_accumulate() {
        let t = Term::at(TermKind::Var("ghost".into()), rill_common::Span::new(4, 9));
        let err = eval_closed(&t).unwrap_err();
        assert_eq!(err.kind, "not_found");
        assert_eq!(err.positions, vec![rill_common::Span::new(4, 9)]);
    }
}
