//! Subtyping and unification engine.
//!
//! `subtype(a, b)` means "a value typed `a` may be used where `b` is
//! expected" and resolves types by controlled mutation of variable
//! cells. `sup` is the pure approximate join consulted before widening
//! a covariant link. Generalization and instantiation of schemes live
//! here too, next to the level bookkeeping they depend on.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::TypeError;
use crate::pretty::{Repr, ReprBuilder};
use crate::ty::{
    Constraint, GroundTag, Param, Scheme, TyDescr, TypeArena, TypeId, VarCell, VarId, Variance,
};

/// Raised by [`Unifier::sup`] on structural mismatch; the caller keeps
/// its previous target unchanged.
#[derive(Debug)]
pub struct Incompatible;

/// The policy switches the engine exposes.
///
/// Both trade program acceptance against strictness and default to the
/// permissive behavior.
#[derive(Copy, Clone, Debug)]
pub struct Policy {
    /// Widen covariant links via `sup` instead of unifying against the
    /// linked type. Off, fewer heterogeneous-literal programs check.
    pub widen_covariant: bool,
    /// Tolerate unmatched trailing optional parameters in arrow
    /// subtyping.
    pub forget_arguments: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Policy { widen_covariant: true, forget_arguments: true }
    }
}

/// The mutating half of the type checker: owns a borrow of the arena
/// plus the policy switches.
pub struct Unifier<'a> {
    pub arena: &'a mut TypeArena,
    pub policy: Policy,
}

impl<'a> Unifier<'a> {
    pub fn new(arena: &'a mut TypeArena) -> Self {
        Unifier { arena, policy: Policy::default() }
    }

    pub fn with_policy(arena: &'a mut TypeArena, policy: Policy) -> Self {
        Unifier { arena, policy }
    }

    fn mismatch(&self, a: TypeId, b: TypeId) -> TypeError {
        let mut rb = ReprBuilder::new(self.arena);
        let found = rb.repr(a);
        let expected = rb.repr(b);
        TypeError::Mismatch { found, expected, span: self.arena.span(a).or(self.arena.span(b)) }
    }

    // ── Subtyping ───────────────────────────────────────────────────

    /// Check `a <: b`, linking free variables as needed.
    pub fn subtype(&mut self, a: TypeId, b: TypeId) -> Result<(), TypeError> {
        let a = self.arena.deref(a);

        // A covariant link absorbs repeated joins: peek at the raw cell
        // before dereferencing the expected side.
        let mut b_id = b;
        loop {
            let v = match self.arena.descr(b_id) {
                TyDescr::Var(v) => *v,
                _ => break,
            };
            match self.arena.var_cell(v).clone() {
                VarCell::Free { .. } => break,
                VarCell::Link { variance: Variance::Covariant, target } => {
                    if self.policy.widen_covariant {
                        let wider = match self.sup(a, target) {
                            Ok(w) => w,
                            Err(Incompatible) => target,
                        };
                        let wider = self.arena.deref(wider);
                        let target = self.arena.deref(target);
                        if wider != target {
                            self.subtype(target, wider)?;
                            self.arena.set_link(v, Variance::Covariant, wider);
                        }
                        return self.subtype(a, wider);
                    }
                    b_id = target;
                }
                VarCell::Link { target, .. } => b_id = target,
            }
        }
        let b = self.arena.deref(b_id);
        if a == b {
            return Ok(());
        }

        let da = self.arena.descr(a).clone();
        let db = self.arena.descr(b).clone();
        match (da, db) {
            (TyDescr::Var(va), TyDescr::Var(vb)) if va == vb => Ok(()),
            (_, TyDescr::Var(vb)) => self.bind(vb, a, Variance::Covariant),
            (TyDescr::Var(va), _) => self.bind(va, b, Variance::Invariant),

            // Row subtyping, driven by the fields the expected side
            // demands.
            (_, TyDescr::Meth { label, scheme: sb, optional, .. }) => {
                match self.arena.invoke_meth(a, &label) {
                    Some(sa) => {
                        // Fields are compared at a non-generalizing
                        // level, in both directions.
                        let ta = self.instantiate(0, &sa);
                        let tb = self.instantiate(0, &sb);
                        self.subtype(ta, tb)
                            .map_err(|e| e.map_reprs(|r| r.in_meth(&label)))?;
                        self.subtype(tb, ta)
                            .map_err(|e| e.map_reprs(|r| r.in_meth(&label)))?;
                        let ha = self.arena.hide_meth(&label, a);
                        let hb = self.arena.hide_meth(&label, b);
                        self.subtype(ha, hb)
                    }
                    None => {
                        let abase = self.arena.demeth(a);
                        if let Some(v) = self.arena.as_free_var(abase) {
                            // Extend the still-open row with a
                            // placeholder field, then retry.
                            let level = self.arena.var_level(v);
                            let field = self.arena.fresh_var(level);
                            let nbase = self.arena.fresh_var(level);
                            let ext = if optional {
                                self.arena.meth_opt(
                                    label.clone(),
                                    Scheme::mono(field),
                                    "",
                                    None,
                                    nbase,
                                )
                            } else {
                                self.arena.meth(
                                    label.clone(),
                                    Scheme::mono(field),
                                    "",
                                    None,
                                    nbase,
                                )
                            };
                            self.bind(v, ext, Variance::Invariant)?;
                            self.subtype(a, b)
                        } else if optional {
                            // A fixed value may lack an optional field.
                            let hb = self.arena.hide_meth(&label, b);
                            self.subtype(a, hb)
                        } else {
                            let ty = ReprBuilder::new(self.arena).repr(a);
                            Err(TypeError::NoMethod { label, ty, span: self.arena.span(a) })
                        }
                    }
                }
            }
            // A record reaching a nullable or getter expectation keeps
            // its fields for the injected check; only a record whose
            // carrier already is the same wrapper strips them first.
            (TyDescr::Meth { base, .. }, TyDescr::Nullable(t2)) => {
                let carrier = self.arena.demeth(a);
                if matches!(self.arena.descr(carrier), TyDescr::Nullable(_)) {
                    self.subtype(base, b)
                } else {
                    self.subtype(a, t2).map_err(|e| e.map_reprs(|r| r.in_nullable()))
                }
            }
            (TyDescr::Meth { base, .. }, TyDescr::Getter(t2)) => {
                let carrier = self.arena.demeth(a);
                if matches!(
                    self.arena.descr(carrier),
                    TyDescr::Getter(_) | TyDescr::Arrow { .. }
                ) {
                    self.subtype(base, b)
                } else {
                    self.subtype(a, t2).map_err(|e| e.map_reprs(|r| r.in_getter()))
                }
            }
            // Width subtyping: fields the expected side does not
            // mention are tolerated.
            (TyDescr::Meth { base, .. }, _) => self.subtype(base, b),

            (TyDescr::Ground(g1), TyDescr::Ground(g2)) => {
                let widening =
                    matches!(g1, GroundTag::Int) && matches!(g2, GroundTag::Float);
                if g1 == g2 || widening {
                    Ok(())
                } else {
                    Err(self.mismatch(a, b))
                }
            }

            (TyDescr::Getter(t1), TyDescr::Getter(t2)) => {
                self.subtype(t1, t2).map_err(|e| e.map_reprs(|r| r.in_getter()))
            }
            (TyDescr::Arrow { ref params, ret }, TyDescr::Getter(t2)) if params.is_empty() => {
                self.subtype(ret, t2).map_err(|e| e.map_reprs(|r| r.in_getter()))
            }
            (TyDescr::Getter(t1), TyDescr::Arrow { ref params, ret }) if params.is_empty() => {
                self.subtype(t1, ret).map_err(|e| e.map_reprs(|r| r.in_getter()))
            }
            // A constant is usable wherever a getter is expected.
            (_, TyDescr::Getter(t2)) => {
                self.subtype(a, t2).map_err(|e| e.map_reprs(|r| r.in_getter()))
            }

            (TyDescr::List { elem: e1, .. }, TyDescr::List { elem: e2, .. }) => {
                self.subtype(e1, e2).map_err(|e| e.map_reprs(|r| r.in_list()))
            }
            (TyDescr::Nullable(t1), TyDescr::Nullable(t2)) => {
                self.subtype(t1, t2).map_err(|e| e.map_reprs(|r| r.in_nullable()))
            }
            // A plain value is usable where a nullable is expected.
            (_, TyDescr::Nullable(t2)) => {
                self.subtype(a, t2).map_err(|e| e.map_reprs(|r| r.in_nullable()))
            }

            (TyDescr::Tuple(xs), TyDescr::Tuple(ys)) => {
                if xs.len() != ys.len() {
                    return Err(self.mismatch(a, b));
                }
                let arity = xs.len();
                for (i, (x, y)) in xs.iter().zip(ys.iter()).enumerate() {
                    self.subtype(*x, *y)
                        .map_err(|e| e.map_reprs(|r| r.in_tuple(i, arity)))?;
                }
                Ok(())
            }

            (TyDescr::Arrow { params: p, ret: r1 }, TyDescr::Arrow { params: q, ret: r2 }) => {
                let mut remaining = p;
                for qp in &q {
                    match remaining.iter().position(|pp| pp.label == qp.label) {
                        Some(i) => {
                            let pp = remaining.remove(i);
                            if qp.optional && !pp.optional {
                                return Err(self.mismatch(a, b));
                            }
                            self.subtype(pp.ty, qp.ty).map_err(|e| {
                                e.map_reprs(|r| r.in_arrow_param(qp.optional, &qp.label))
                            })?;
                        }
                        None => {
                            return Err(TypeError::NoLabel {
                                label: qp.label.clone(),
                                span: self.arena.span(b).or(self.arena.span(a)),
                            });
                        }
                    }
                }
                if !remaining.is_empty() {
                    let all_optional = remaining.iter().all(|pp| pp.optional);
                    if !(all_optional && self.policy.forget_arguments) {
                        return Err(TypeError::MissingArguments {
                            labels: remaining.iter().map(|pp| pp.label.clone()).collect(),
                            span: self.arena.span(a).or(self.arena.span(b)),
                        });
                    }
                }
                self.subtype(r1, r2).map_err(|e| e.map_reprs(|r| r.in_arrow_ret()))
            }

            (
                TyDescr::Constr { name: n1, params: ps1 },
                TyDescr::Constr { name: n2, params: ps2 },
            ) => {
                if n1 != n2 || ps1.len() != ps2.len() {
                    return Err(self.mismatch(a, b));
                }
                let arity = ps1.len();
                for (i, ((variance, x), (_, y))) in ps1.iter().zip(ps2.iter()).enumerate() {
                    match variance {
                        Variance::Covariant => {
                            self.subtype(*x, *y)
                                .map_err(|e| e.map_reprs(|r| r.in_constr(&n1, i, arity)))?;
                        }
                        Variance::Invariant => {
                            self.subtype(*x, *y)
                                .map_err(|e| e.map_reprs(|r| r.in_constr(&n1, i, arity)))?;
                            self.subtype(*y, *x)
                                .map_err(|e| e.map_reprs(|r| r.in_constr(&n1, i, arity)))?;
                        }
                    }
                }
                Ok(())
            }

            _ => Err(self.mismatch(a, b)),
        }
    }

    /// Bind a free variable to a type: occur check, constraint
    /// propagation, then link.
    fn bind(&mut self, v: VarId, other: TypeId, variance: Variance) -> Result<(), TypeError> {
        let other = self.arena.deref(other);
        if let TyDescr::Var(w) = self.arena.descr(other) {
            if *w == v {
                return Ok(());
            }
        }
        if self.arena.occurs(v, other) {
            let ty = ReprBuilder::new(self.arena).repr(other);
            return Err(TypeError::InfiniteType { ty, span: self.arena.span(other) });
        }
        for c in self.arena.constraints_of(v) {
            self.satisfies(&c, other)?;
        }
        // Variables reachable through the bound type now escape into
        // the binder's scope: drop them to its level so no inner `let`
        // generalizes them.
        let level = self.arena.var_level(v);
        self.lower_levels(other, level);
        self.arena.set_link(v, variance, other);
        Ok(())
    }

    fn lower_levels(&mut self, t: TypeId, level: u32) {
        let t = self.arena.deref(t);
        match self.arena.descr(t).clone() {
            TyDescr::Var(w) => {
                if self.arena.var_level(w) > level {
                    self.arena.set_var_level(w, level);
                }
            }
            TyDescr::Ground(_) => {}
            TyDescr::Getter(x) | TyDescr::Nullable(x) => self.lower_levels(x, level),
            TyDescr::List { elem, .. } => self.lower_levels(elem, level),
            TyDescr::Tuple(elems) => {
                for e in elems {
                    self.lower_levels(e, level);
                }
            }
            TyDescr::Meth { scheme, base, .. } => {
                self.lower_levels(scheme.ty, level);
                self.lower_levels(base, level);
            }
            TyDescr::Arrow { params, ret } => {
                for p in params {
                    self.lower_levels(p.ty, level);
                }
                self.lower_levels(ret, level);
            }
            TyDescr::Constr { params, .. } => {
                for (_, p) in params {
                    self.lower_levels(p, level);
                }
            }
        }
    }

    /// Check a constraint against a (possibly still partial) type,
    /// recursing through `Nullable`/`Getter`/`Meth` wrappers. A free
    /// variable inherits the constraint instead.
    fn satisfies(&mut self, c: &Constraint, t: TypeId) -> Result<(), TypeError> {
        let t = self.arena.deref(t);
        let descr = self.arena.descr(t).clone();
        match descr {
            TyDescr::Var(w) => {
                self.arena.add_constraint(w, c.clone());
                Ok(())
            }
            TyDescr::Nullable(inner) | TyDescr::Getter(inner) => self.satisfies(c, inner),
            TyDescr::Meth { base, .. } => self.satisfies(c, base),
            descr => match c {
                Constraint::Num => match descr {
                    TyDescr::Ground(GroundTag::Int | GroundTag::Float) => Ok(()),
                    _ => Err(self.constraint_err(c, t)),
                },
                Constraint::Ord => match descr {
                    TyDescr::Ground(GroundTag::Custom(_)) => Err(self.constraint_err(c, t)),
                    TyDescr::Ground(_) => Ok(()),
                    TyDescr::List { elem, .. } => self.satisfies(c, elem),
                    TyDescr::Tuple(elems) => {
                        for e in elems {
                            self.satisfies(c, e)?;
                        }
                        Ok(())
                    }
                    _ => Err(self.constraint_err(c, t)),
                },
                Constraint::Printable => match descr {
                    TyDescr::Ground(GroundTag::Custom(_)) => Err(self.constraint_err(c, t)),
                    TyDescr::Ground(_) => Ok(()),
                    TyDescr::List { elem, .. } => self.satisfies(c, elem),
                    TyDescr::Tuple(elems) => {
                        for e in elems {
                            self.satisfies(c, e)?;
                        }
                        Ok(())
                    }
                    // Functions render as an opaque placeholder.
                    TyDescr::Arrow { .. } => Ok(()),
                    _ => Err(self.constraint_err(c, t)),
                },
                Constraint::InternalMedia => match descr {
                    TyDescr::Ground(GroundTag::Custom(_)) => Ok(()),
                    TyDescr::Constr { ref name, .. } if self.arena.is_custom(name) => Ok(()),
                    _ => Err(self.constraint_err(c, t)),
                },
            },
        }
    }

    fn constraint_err(&self, c: &Constraint, t: TypeId) -> TypeError {
        TypeError::UnsatisfiedConstraint {
            constraint: c.clone(),
            ty: ReprBuilder::new(self.arena).repr(t),
            span: self.arena.span(t),
        }
    }

    // ── Approximate join ────────────────────────────────────────────

    /// Pure, non-mutating approximate join of two types.
    ///
    /// Used only to pick a better candidate before an actual
    /// `subtype`; never links a variable. Allocates fresh nodes for
    /// merged composites.
    pub fn sup(&mut self, a: TypeId, b: TypeId) -> Result<TypeId, Incompatible> {
        let a = self.arena.deref(a);
        let b = self.arena.deref(b);
        if a == b {
            return Ok(a);
        }
        let da = self.arena.descr(a).clone();
        let db = self.arena.descr(b).clone();
        match (da, db) {
            (TyDescr::Var(va), TyDescr::Var(vb)) if va == vb => Ok(a),
            // A free variable follows the other side.
            (TyDescr::Var(_), _) => Ok(b),
            (_, TyDescr::Var(_)) => Ok(a),

            (TyDescr::Ground(g1), TyDescr::Ground(g2)) => {
                if g1 == g2 {
                    Ok(a)
                } else if matches!(
                    (&g1, &g2),
                    (GroundTag::Int, GroundTag::Float) | (GroundTag::Float, GroundTag::Int)
                ) {
                    Ok(self.arena.float())
                } else {
                    Err(Incompatible)
                }
            }

            (TyDescr::Nullable(x), TyDescr::Nullable(y)) => {
                let s = self.sup(x, y)?;
                Ok(self.arena.nullable(s))
            }
            (TyDescr::Nullable(x), _) => {
                let s = self.sup(x, b)?;
                Ok(self.arena.nullable(s))
            }
            (_, TyDescr::Nullable(y)) => {
                let s = self.sup(a, y)?;
                Ok(self.arena.nullable(s))
            }

            (TyDescr::List { elem: x, as_object }, TyDescr::List { elem: y, .. }) => {
                let s = self.sup(x, y)?;
                Ok(self.arena.make(TyDescr::List { elem: s, as_object }))
            }

            (TyDescr::Tuple(xs), TyDescr::Tuple(ys)) if xs.len() == ys.len() => {
                let mut elems = Vec::with_capacity(xs.len());
                for (x, y) in xs.iter().zip(ys.iter()) {
                    elems.push(self.sup(*x, *y)?);
                }
                Ok(self.arena.tuple(elems))
            }

            (TyDescr::Getter(x), TyDescr::Getter(y)) => {
                let s = self.sup(x, y)?;
                Ok(self.arena.getter(s))
            }
            (TyDescr::Getter(x), TyDescr::Arrow { ref params, ret }) if params.is_empty() => {
                let s = self.sup(x, ret)?;
                Ok(self.arena.getter(s))
            }
            (TyDescr::Arrow { ref params, ret }, TyDescr::Getter(y)) if params.is_empty() => {
                let s = self.sup(ret, y)?;
                Ok(self.arena.getter(s))
            }
            (TyDescr::Getter(x), _) => {
                let s = self.sup(x, b)?;
                Ok(self.arena.getter(s))
            }
            (_, TyDescr::Getter(y)) => {
                let s = self.sup(a, y)?;
                Ok(self.arena.getter(s))
            }

            (TyDescr::Arrow { params: p, ret: r1 }, TyDescr::Arrow { params: q, ret: r2 }) => {
                if p.len() != q.len() {
                    return Err(Incompatible);
                }
                let mut params = Vec::with_capacity(p.len());
                for (pp, qp) in p.iter().zip(q.iter()) {
                    if pp.label != qp.label || pp.optional != qp.optional {
                        return Err(Incompatible);
                    }
                    params.push(Param {
                        optional: pp.optional,
                        label: pp.label.clone(),
                        ty: self.sup(pp.ty, qp.ty)?,
                    });
                }
                let ret = self.sup(r1, r2)?;
                Ok(self.arena.arrow(params, ret))
            }

            (TyDescr::Meth { label, scheme, doc, json_name, optional, base }, _) => {
                if self.arena.invoke_meth(b, &label).is_some() {
                    let hb = self.arena.hide_meth(&label, b);
                    let rest = self.sup(base, hb)?;
                    Ok(self.arena.make(TyDescr::Meth {
                        label,
                        scheme,
                        doc,
                        json_name,
                        optional,
                        base: rest,
                    }))
                } else {
                    // Width join: drop the field the other side lacks.
                    self.sup(base, b)
                }
            }
            (_, TyDescr::Meth { base, .. }) => self.sup(a, base),

            (
                TyDescr::Constr { name: n1, params: ps1 },
                TyDescr::Constr { name: n2, params: ps2 },
            ) => {
                if n1 != n2 || ps1.len() != ps2.len() {
                    return Err(Incompatible);
                }
                let mut params = Vec::with_capacity(ps1.len());
                for ((variance, x), (_, y)) in ps1.iter().zip(ps2.iter()) {
                    params.push((*variance, self.sup(*x, *y)?));
                }
                Ok(self.arena.make(TyDescr::Constr { name: n1, params }))
            }

            _ => Err(Incompatible),
        }
    }

    // ── Generalization / instantiation ──────────────────────────────

    /// Free variables reachable in `t` whose level exceeds `level`,
    /// skipping variables already quantified by a row entry's scheme.
    pub fn generalizable(&self, level: u32, t: TypeId) -> Vec<VarId> {
        let mut out = Vec::new();
        let mut excluded = FxHashSet::default();
        self.collect_generalizable(level, t, &mut excluded, &mut out);
        out
    }

    fn collect_generalizable(
        &self,
        level: u32,
        t: TypeId,
        excluded: &mut FxHashSet<VarId>,
        out: &mut Vec<VarId>,
    ) {
        let t = self.arena.deref(t);
        match self.arena.descr(t) {
            TyDescr::Var(v) => {
                if self.arena.var_level(*v) > level && !excluded.contains(v) && !out.contains(v) {
                    out.push(*v);
                }
            }
            TyDescr::Ground(_) => {}
            TyDescr::Getter(x) | TyDescr::Nullable(x) => {
                self.collect_generalizable(level, *x, excluded, out)
            }
            TyDescr::List { elem, .. } => self.collect_generalizable(level, *elem, excluded, out),
            TyDescr::Tuple(elems) => {
                for e in elems.clone() {
                    self.collect_generalizable(level, e, excluded, out);
                }
            }
            TyDescr::Meth { scheme, base, .. } => {
                let (svars, sty, base) = (scheme.vars.clone(), scheme.ty, *base);
                for v in svars {
                    excluded.insert(v);
                }
                self.collect_generalizable(level, sty, excluded, out);
                self.collect_generalizable(level, base, excluded, out);
            }
            TyDescr::Arrow { params, ret } => {
                let (ptys, ret): (Vec<TypeId>, TypeId) =
                    (params.iter().map(|p| p.ty).collect(), *ret);
                for p in ptys {
                    self.collect_generalizable(level, p, excluded, out);
                }
                self.collect_generalizable(level, ret, excluded, out);
            }
            TyDescr::Constr { params, .. } => {
                for (_, p) in params.clone() {
                    self.collect_generalizable(level, p, excluded, out);
                }
            }
        }
    }

    /// Promote the generalizable variables of `t` into a scheme.
    pub fn generalize(&self, level: u32, t: TypeId) -> Scheme {
        Scheme { vars: self.generalizable(level, t), ty: t }
    }

    /// Copy a scheme's body, replacing each quantified variable with a
    /// fresh one at `level` carrying the same constraints. Everything
    /// else is shared, not copied.
    pub fn instantiate(&mut self, level: u32, scheme: &Scheme) -> TypeId {
        if scheme.vars.is_empty() {
            return scheme.ty;
        }
        let mut subst = FxHashMap::default();
        for v in &scheme.vars {
            let constraints = self.arena.constraints_of(*v);
            let fresh = self.arena.fresh_var_with(level, constraints, None);
            subst.insert(*v, fresh);
        }
        self.copy_with(scheme.ty, &subst)
    }

    fn copy_with(&mut self, t: TypeId, subst: &FxHashMap<VarId, TypeId>) -> TypeId {
        let t = self.arena.deref(t);
        let span = self.arena.span(t);
        match self.arena.descr(t).clone() {
            TyDescr::Var(v) => subst.get(&v).copied().unwrap_or(t),
            TyDescr::Ground(_) => t,
            TyDescr::Getter(x) => {
                let x2 = self.copy_with(x, subst);
                if x2 == self.arena.deref(x) {
                    t
                } else {
                    self.arena.make_at(TyDescr::Getter(x2), span)
                }
            }
            TyDescr::Nullable(x) => {
                let x2 = self.copy_with(x, subst);
                if x2 == self.arena.deref(x) {
                    t
                } else {
                    self.arena.make_at(TyDescr::Nullable(x2), span)
                }
            }
            TyDescr::List { elem, as_object } => {
                let e2 = self.copy_with(elem, subst);
                if e2 == self.arena.deref(elem) {
                    t
                } else {
                    self.arena.make_at(TyDescr::List { elem: e2, as_object }, span)
                }
            }
            TyDescr::Tuple(elems) => {
                let copies: Vec<TypeId> =
                    elems.iter().map(|e| self.copy_with(*e, subst)).collect();
                let unchanged = elems
                    .iter()
                    .zip(copies.iter())
                    .all(|(e, c)| *c == self.arena.deref(*e));
                if unchanged {
                    t
                } else {
                    self.arena.make_at(TyDescr::Tuple(copies), span)
                }
            }
            TyDescr::Meth { label, scheme, doc, json_name, optional, base } => {
                let ty2 = self.copy_with(scheme.ty, subst);
                let base2 = self.copy_with(base, subst);
                if ty2 == self.arena.deref(scheme.ty) && base2 == self.arena.deref(base) {
                    t
                } else {
                    self.arena.make_at(
                        TyDescr::Meth {
                            label,
                            scheme: Scheme { vars: scheme.vars, ty: ty2 },
                            doc,
                            json_name,
                            optional,
                            base: base2,
                        },
                        span,
                    )
                }
            }
            TyDescr::Arrow { params, ret } => {
                let params2: Vec<Param> = params
                    .iter()
                    .map(|p| Param {
                        optional: p.optional,
                        label: p.label.clone(),
                        ty: self.copy_with(p.ty, subst),
                    })
                    .collect();
                let ret2 = self.copy_with(ret, subst);
                let unchanged = ret2 == self.arena.deref(ret)
                    && params
                        .iter()
                        .zip(params2.iter())
                        .all(|(p, c)| c.ty == self.arena.deref(p.ty));
                if unchanged {
                    t
                } else {
                    self.arena.make_at(TyDescr::Arrow { params: params2, ret: ret2 }, span)
                }
            }
            TyDescr::Constr { name, params } => {
                let params2: Vec<(Variance, TypeId)> = params
                    .iter()
                    .map(|(v, p)| (*v, self.copy_with(*p, subst)))
                    .collect();
                let unchanged = params
                    .iter()
                    .zip(params2.iter())
                    .all(|((_, p), (_, c))| *c == self.arena.deref(*p));
                if unchanged {
                    t
                } else {
                    self.arena.make_at(TyDescr::Constr { name, params: params2 }, span)
                }
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
