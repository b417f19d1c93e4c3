//! Type inference over [`Term`] trees.
//!
//! A single bottom-up pass: literals and variables synthesize, every
//! composite checks its parts with `subtype`, and `let` generalizes
//! behind the value restriction. The checker writes each term's
//! resolved type into its slot so later phases (evaluation, toplevel
//! registration) can read it back.

use rustc_hash::FxHashSet;

use crate::env::TypeEnv;
use crate::error::{TypeError, TypeWarning};
use crate::pretty::ReprBuilder;
use crate::term::{FunDef, Pattern, PatternKind, Term, TermKind};
use crate::ty::{Constraint, GroundTag, Param, Scheme, TyDescr, TypeArena, TypeId};
use crate::unify::{Policy, Unifier};
use rill_common::Span;

/// Switches controlling how permissive a checking pass is.
#[derive(Copy, Clone, Debug)]
pub struct CheckOptions {
    /// Promote lint warnings to hard errors.
    pub strict: bool,
    /// See [`Policy::widen_covariant`].
    pub widen_covariant: bool,
    /// See [`Policy::forget_arguments`].
    pub forget_arguments: bool,
    /// Let an application that leaves mandatory parameters unsupplied
    /// produce a function of the leftovers instead of failing.
    pub partial_application: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            strict: false,
            widen_covariant: true,
            forget_arguments: true,
            partial_application: true,
        }
    }
}

/// The result of a successful checking pass.
#[derive(Debug)]
pub struct CheckOutput {
    pub ty: TypeId,
    pub warnings: Vec<TypeWarning>,
}

/// Check `term` in `env`, resolving types into `arena`.
pub fn check(
    arena: &mut TypeArena,
    env: &mut TypeEnv,
    term: &Term,
    opts: CheckOptions,
) -> Result<CheckOutput, TypeError> {
    let mut checker = Checker { arena, env, opts, level: 0, warnings: Vec::new() };
    let ty = checker.infer(term)?;
    Ok(CheckOutput { ty, warnings: checker.warnings })
}

/// Whether a term is a syntactic value, i.e. evaluating it can have no
/// side effect. Only such definitions generalize.
pub fn value_restriction(term: &Term) -> bool {
    match &term.kind {
        TermKind::Var(_)
        | TermKind::Ground(_)
        | TermKind::Null
        | TermKind::Fun(_)
        | TermKind::RFun { .. } => true,
        TermKind::Cast { term, .. } => value_restriction(term),
        TermKind::List(items) | TermKind::Tuple(items) => items.iter().all(value_restriction),
        TermKind::Meth { def, rest, .. } => value_restriction(def) && value_restriction(rest),
        _ => false,
    }
}

struct Checker<'a> {
    arena: &'a mut TypeArena,
    env: &'a mut TypeEnv,
    opts: CheckOptions,
    level: u32,
    warnings: Vec<TypeWarning>,
}

impl Checker<'_> {
    fn unifier(&mut self) -> Unifier<'_> {
        Unifier::with_policy(
            self.arena,
            Policy {
                widen_covariant: self.opts.widen_covariant,
                forget_arguments: self.opts.forget_arguments,
            },
        )
    }

    fn subtype(&mut self, a: TypeId, b: TypeId) -> Result<(), TypeError> {
        self.unifier().subtype(a, b)
    }

    fn instantiate(&mut self, scheme: &Scheme) -> TypeId {
        let level = self.level;
        self.unifier().instantiate(level, scheme)
    }

    fn warn(&mut self, w: TypeWarning) -> Result<(), TypeError> {
        if self.opts.strict {
            Err(TypeError::Lint(w))
        } else {
            self.warnings.push(w);
            Ok(())
        }
    }

    fn infer(&mut self, term: &Term) -> Result<TypeId, TypeError> {
        let ty = self.infer_kind(term).map_err(|e| e.with_span(term.span))?;
        term.ty.set(Some(ty));
        Ok(ty)
    }

    fn infer_kind(&mut self, term: &Term) -> Result<TypeId, TypeError> {
        match &term.kind {
            TermKind::Ground(lit) => Ok(self.literal(lit, term.span)),

            TermKind::List(items) => {
                let elem = self.arena.fresh_var(self.level);
                for item in items {
                    let t = self.infer(item)?;
                    self.subtype(t, elem).map_err(|e| e.with_span(item.span))?;
                }
                Ok(self.arena.make_at(TyDescr::List { elem, as_object: false }, term.span))
            }

            TermKind::Tuple(items) => {
                let mut elems = Vec::with_capacity(items.len());
                for item in items {
                    elems.push(self.infer(item)?);
                }
                Ok(self.arena.make_at(TyDescr::Tuple(elems), term.span))
            }

            TermKind::Null => {
                let inner = self.arena.fresh_var(self.level);
                Ok(self.arena.make_at(TyDescr::Nullable(inner), term.span))
            }

            TermKind::Cast { term: inner, ty } => {
                let t = self.infer(inner)?;
                self.subtype(t, *ty)?;
                Ok(*ty)
            }

            TermKind::Meth { label, def, rest } => {
                self.level += 1;
                let td = self.infer(def);
                self.level -= 1;
                let td = td?;
                let scheme = if value_restriction(def) {
                    let level = self.level;
                    self.unifier().generalize(level, td)
                } else {
                    Scheme::mono(td)
                };
                let tr = self.infer(rest)?;
                Ok(self.arena.make_at(
                    TyDescr::Meth {
                        label: label.clone(),
                        scheme,
                        doc: String::new(),
                        json_name: None,
                        optional: false,
                        base: tr,
                    },
                    term.span,
                ))
            }

            TermKind::Invoke { obj, label, default } => {
                let to = self.infer(obj)?;
                match self.arena.invoke_meth(to, label) {
                    Some(scheme) => {
                        let t = self.instantiate(&scheme);
                        if let Some(d) = default {
                            let td = self.infer(d)?;
                            self.subtype(td, t).map_err(|e| e.with_span(d.span))?;
                        }
                        Ok(t)
                    }
                    None => {
                        // Demand the field: an open row gains it, a
                        // fixed type without it fails in the engine.
                        // With a default, a still-open object only
                        // gains an optional field, so values lacking
                        // it stay usable.
                        let f = self.arena.fresh_var(self.level);
                        let base = self.arena.fresh_var(self.level);
                        let carrier = self.arena.demeth(to);
                        let open = self.arena.as_free_var(carrier).is_some();
                        let want = if default.is_some() && open {
                            self.arena.meth_opt(label.clone(), Scheme::mono(f), "", None, base)
                        } else {
                            self.arena.meth(label.clone(), Scheme::mono(f), "", None, base)
                        };
                        self.subtype(to, want).map_err(|e| e.with_span(obj.span))?;
                        if let Some(d) = default {
                            let td = self.infer(d)?;
                            self.subtype(td, f).map_err(|e| e.with_span(d.span))?;
                        }
                        Ok(f)
                    }
                }
            }

            TermKind::Open { obj, body } => {
                let to = self.infer(obj)?;
                // Anything with fields over unit qualifies.
                let u = self.arena.unit();
                self.subtype(to, u).map_err(|e| e.with_span(obj.span))?;
                let (entries, _) = self.arena.split_meths(to);
                self.env.push_scope();
                // Front entries win row lookup; insert them last so
                // they also win scope lookup.
                for e in entries.into_iter().rev() {
                    self.env.insert_exempt(e.label, e.scheme, obj.span);
                }
                let tb = self.infer(body)?;
                self.env.pop_scope();
                Ok(tb)
            }

            TermKind::Let(ld) => {
                self.level += 1;
                let td = self.infer(&ld.def);
                self.level -= 1;
                let td = td?;
                let gen = value_restriction(&ld.def);
                ld.generalized.set(gen);
                self.env.push_scope();
                self.bind_pattern(&ld.pat, td, gen)?;
                let tb = self.infer(&ld.body)?;
                for (name, span) in self.env.pop_scope() {
                    self.warn(TypeWarning::UnusedVariable { name, span })?;
                }
                Ok(tb)
            }

            TermKind::Var(name) => match self.env.lookup(name).cloned() {
                Some(scheme) => Ok(self.instantiate(&scheme)),
                None => Err(TypeError::Unbound { name: name.clone(), span: term.span }),
            },

            TermKind::Seq(a, b) => {
                let ta = self.infer(a)?;
                if !self.ignorable(ta) {
                    let ty = ReprBuilder::new(self.arena).repr(ta);
                    self.warn(TypeWarning::IgnoredValue { ty, span: a.span })?;
                }
                self.infer(b)
            }

            TermKind::App { fun, args } => {
                let tf = self.infer(fun)?;
                let callee = self.arena.demeth(tf);
                match self.arena.descr(callee).clone() {
                    TyDescr::Arrow { params, ret } => {
                        self.check_app(&params, ret, args, term.span)
                    }
                    _ => {
                        // Not (yet) an arrow: synthesize the call shape
                        // from the actuals and constrain the callee.
                        let mut ps = Vec::with_capacity(args.len());
                        for (label, arg) in args {
                            let ta = self.infer(arg)?;
                            ps.push(Param::new(label.clone(), ta));
                        }
                        let ret = self.arena.fresh_var(self.level);
                        let want = self.arena.arrow(ps, ret);
                        self.subtype(tf, want).map_err(|e| e.with_span(fun.span))?;
                        Ok(ret)
                    }
                }
            }

            TermKind::Fun(def) => self.infer_fun(def, None),
            TermKind::RFun { self_name, fun } => self.infer_fun(fun, Some(self_name)),
        }
    }

    fn literal(&mut self, lit: &crate::term::GroundLit, span: Option<Span>) -> TypeId {
        match lit {
            crate::term::GroundLit::Bool(_) => {
                self.arena.make_at(TyDescr::Ground(GroundTag::Bool), span)
            }
            // An integer literal is numeric until context decides; a
            // surrounding float forces the literal itself to float.
            crate::term::GroundLit::Int(_) => {
                self.arena.fresh_var_with(self.level, vec![Constraint::Num], span)
            }
            crate::term::GroundLit::Float(_) => {
                self.arena.make_at(TyDescr::Ground(GroundTag::Float), span)
            }
            crate::term::GroundLit::String(_) => {
                self.arena.make_at(TyDescr::Ground(GroundTag::String), span)
            }
        }
    }

    /// Apply a known arrow to labeled actuals.
    ///
    /// Each formal is consumed at most once; labels match order-
    /// independently, positional actuals consume positional formals in
    /// order.
    fn check_app(
        &mut self,
        params: &[Param],
        ret: TypeId,
        args: &[(String, Term)],
        span: Option<Span>,
    ) -> Result<TypeId, TypeError> {
        let mut remaining: Vec<Param> = params.to_vec();
        for (label, arg) in args {
            let pos = remaining.iter().position(|p| &p.label == label).ok_or_else(|| {
                TypeError::NoLabel { label: label.clone(), span: arg.span.or(span) }
            })?;
            let p = remaining.remove(pos);
            let ta = self.infer(arg)?;
            self.subtype(ta, p.ty).map_err(|e| {
                e.map_reprs(|r| r.in_arrow_param(p.optional, &p.label)).with_span(arg.span)
            })?;
        }
        let mandatory: Vec<String> = remaining
            .iter()
            .filter(|p| !p.optional)
            .map(|p| p.label.clone())
            .collect();
        if mandatory.is_empty() {
            // Unused optionals keep their defaults.
            return Ok(ret);
        }
        if self.opts.partial_application {
            // Partial application: a function of every leftover formal.
            return Ok(self.arena.arrow(remaining, ret));
        }
        Err(TypeError::MissingArguments { labels: mandatory, span })
    }

    fn infer_fun(
        &mut self,
        def: &FunDef,
        self_name: Option<&str>,
    ) -> Result<TypeId, TypeError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for p in &def.params {
            if !p.label.is_empty() && !seen.insert(&p.label) {
                return Err(TypeError::DuplicateLabel { label: p.label.clone(), span: p.span });
            }
        }
        self.env.push_scope();
        let mut params = Vec::with_capacity(def.params.len());
        for p in &def.params {
            let ty = match p.ty {
                Some(t) => t,
                None => self.arena.fresh_var_with(self.level, Vec::new(), p.span),
            };
            if let Some(d) = &p.default {
                let td = self.infer(d)?;
                self.subtype(td, ty).map_err(|e| e.with_span(d.span))?;
            }
            params.push(Param { optional: p.default.is_some(), label: p.label.clone(), ty });
            self.env.insert(p.name.clone(), Scheme::mono(ty), p.span);
        }
        let ret_slot = self.arena.fresh_var(self.level);
        if let Some(name) = self_name {
            let self_ty = self.arena.arrow(params.clone(), ret_slot);
            self.env.insert_exempt(name, Scheme::mono(self_ty), None);
        }
        let tb = self.infer(&def.body)?;
        let result = self.subtype(tb, ret_slot);
        for (name, span) in self.env.pop_scope() {
            self.warn(TypeWarning::UnusedVariable { name, span })?;
        }
        result?;
        // Fix the capture list while the checked body is at hand.
        def.free_vars();
        Ok(self.arena.arrow(params, ret_slot))
    }

    /// A value whose type derefs here may be dropped by `;` without a
    /// warning.
    fn ignorable(&self, t: TypeId) -> bool {
        let t = self.arena.deref(t);
        match self.arena.descr(t) {
            TyDescr::Var(_) => true,
            TyDescr::Tuple(elems) => elems.is_empty(),
            TyDescr::Nullable(inner) => {
                let inner = self.arena.deref(*inner);
                matches!(self.arena.descr(inner), TyDescr::Var(_))
                    || self.arena.is_unit(inner)
            }
            // A record is as ignorable as the value under its fields.
            TyDescr::Meth { .. } => {
                let base = self.arena.demeth(t);
                base != t && self.ignorable(base)
            }
            _ => false,
        }
    }

    fn bind_pattern(&mut self, pat: &Pattern, ty: TypeId, gen: bool) -> Result<(), TypeError> {
        match &pat.kind {
            PatternKind::Var(path) => match path.as_slice() {
                [] => Ok(()),
                [name] => {
                    let scheme = self.scheme_for(ty, gen);
                    self.env.insert(name.clone(), scheme, pat.span);
                    Ok(())
                }
                [root, rest @ ..] => {
                    let scheme = self.env.lookup(root).cloned().ok_or_else(|| {
                        TypeError::Unbound { name: root.clone(), span: pat.span }
                    })?;
                    let troot = self.instantiate(&scheme);
                    let rebuilt = self.splice_field(troot, rest, ty, gen, pat.span)?;
                    self.env.insert(root.clone(), Scheme::mono(rebuilt), pat.span);
                    Ok(())
                }
            },
            PatternKind::Tuple(pats) => {
                let slots: Vec<TypeId> =
                    pats.iter().map(|_| self.arena.fresh_var(self.level)).collect();
                let want = self.arena.make_at(TyDescr::Tuple(slots.clone()), pat.span);
                self.subtype(ty, want).map_err(|e| e.with_span(pat.span))?;
                for (p, slot) in pats.iter().zip(slots) {
                    self.bind_pattern(p, slot, gen)?;
                }
                Ok(())
            }
            PatternKind::List { before, spread, after } => {
                let elem = self.arena.fresh_var(self.level);
                let want = self.arena.make_at(
                    TyDescr::List { elem, as_object: false },
                    pat.span,
                );
                self.subtype(ty, want).map_err(|e| e.with_span(pat.span))?;
                for p in before.iter().chain(after.iter()) {
                    self.bind_pattern(p, elem, gen)?;
                }
                if let Some(name) = spread {
                    let rest_ty =
                        self.arena.make_at(TyDescr::List { elem, as_object: false }, pat.span);
                    let scheme = self.scheme_for(rest_ty, gen);
                    self.env.insert(name.clone(), scheme, pat.span);
                }
                Ok(())
            }
            PatternKind::Meth { base, fields } => {
                let tail = self.arena.fresh_var(self.level);
                let mut want = tail;
                for f in fields.iter().rev() {
                    let slot = self.arena.fresh_var(self.level);
                    want = self.arena.meth(f.clone(), Scheme::mono(slot), "", None, want);
                }
                self.subtype(ty, want).map_err(|e| e.with_span(pat.span))?;
                for f in fields {
                    let scheme = self.arena.invoke_meth(ty, f).ok_or_else(|| {
                        let repr = ReprBuilder::new(self.arena).repr(ty);
                        TypeError::NoMethod { label: f.clone(), ty: repr, span: pat.span }
                    })?;
                    self.env.insert(f.clone(), scheme, pat.span);
                }
                if let Some(bp) = base {
                    let mut rest = ty;
                    for f in fields {
                        rest = self.arena.hide_meth(f, rest);
                    }
                    self.bind_pattern(bp, rest, gen)?;
                }
                Ok(())
            }
        }
    }

    fn scheme_for(&mut self, ty: TypeId, gen: bool) -> Scheme {
        if gen {
            let level = self.level;
            self.unifier().generalize(level, ty)
        } else {
            Scheme::mono(ty)
        }
    }

    /// Rebuild a record along a dotted path, shadowing `path`'s last
    /// field with `leaf` and leaving everything else reachable.
    fn splice_field(
        &mut self,
        obj: TypeId,
        path: &[String],
        leaf: TypeId,
        gen: bool,
        span: Option<Span>,
    ) -> Result<TypeId, TypeError> {
        match path {
            [] => Ok(leaf),
            [field] => {
                let scheme = self.scheme_for(leaf, gen);
                Ok(self.arena.meth(field.clone(), scheme, "", None, obj))
            }
            [field, rest @ ..] => {
                let inner = match self.arena.invoke_meth(obj, field) {
                    Some(s) => self.instantiate(&s),
                    None => {
                        let slot = self.arena.fresh_var(self.level);
                        let tail = self.arena.fresh_var(self.level);
                        let want =
                            self.arena.meth(field.clone(), Scheme::mono(slot), "", None, tail);
                        self.subtype(obj, want).map_err(|e| e.with_span(span))?;
                        slot
                    }
                };
                let rebuilt = self.splice_field(inner, rest, leaf, gen, span)?;
                Ok(self.arena.meth(field.clone(), Scheme::mono(rebuilt), "", None, obj))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer_closed(term: &Term) -> Result<CheckOutput, TypeError> {
        let mut arena = TypeArena::new();
        let mut env = TypeEnv::new();
        check(&mut arena, &mut env, term, CheckOptions::default())
    }

    #[test]
    fn literals_and_tuples() {
        let t = Term::tuple(vec![Term::bool_(true), Term::string("x")]);
        let mut arena = TypeArena::new();
        let mut env = TypeEnv::new();
        let out = check(&mut arena, &mut env, &t, CheckOptions::default()).unwrap();
        assert_eq!(crate::pretty::print_type(&arena, out.ty), "(bool, string)");
    }

    #[test]
    fn heterogeneous_numeric_list_widens_to_float() {
        let t = Term::list(vec![Term::int(1), Term::float(2.0)]);
        let mut arena = TypeArena::new();
        let mut env = TypeEnv::new();
        let out = check(&mut arena, &mut env, &t, CheckOptions::default()).unwrap();
        assert_eq!(crate::pretty::print_type(&arena, out.ty), "[float]");
    }

    #[test]
    fn unbound_variable_reports_name() {
        let err = infer_closed(&Term::var("nope")).unwrap_err();
        assert_eq!(err.to_string(), "unbound variable `nope`");
    }

    #[test]
    fn strict_mode_promotes_unused_lint() {
        let t = Term::let_("x", Term::int(1), Term::unit());
        let mut arena = TypeArena::new();
        let mut env = TypeEnv::new();
        let opts = CheckOptions { strict: true, ..CheckOptions::default() };
        let err = check(&mut arena, &mut env, &t, opts).unwrap_err();
        assert!(matches!(err, TypeError::Lint(TypeWarning::UnusedVariable { .. })));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let t = Term::fun(
            vec![
                crate::term::FunParam::labeled("x"),
                crate::term::FunParam::labeled("x"),
            ],
            Term::unit(),
        );
        let err = infer_closed(&t).unwrap_err();
        assert!(matches!(err, TypeError::DuplicateLabel { .. }));
    }
}
