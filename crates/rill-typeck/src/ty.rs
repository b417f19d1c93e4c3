//! Type representation for the rill type system.
//!
//! Types live in a [`TypeArena`]: a vector of nodes addressed by
//! [`TypeId`], with variable cells in a side vector addressed by
//! [`VarId`]. Linking a variable mutates its cell in place, so the
//! whole inference pass shares one mutable type graph without any
//! pointer cycles. Every consumer must go through [`TypeArena::deref`]
//! before matching on a descriptor.

use rill_common::Span;
use rustc_hash::FxHashSet;

/// Index of a type node in the arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

/// Index of a variable cell in the arena's side table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

/// Variance of a link or of a constructor parameter.
///
/// A `Covariant` link may later be rewritten to a wider join as more
/// constraints arrive during the same checking pass; an `Invariant`
/// link is immutable once set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variance {
    Covariant,
    Invariant,
}

/// Scalar type kinds.
///
/// The closed set covers the kinds the core needs; genuinely opaque
/// media kinds (sources, encoders, requests) register a name and use
/// `Custom`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroundTag {
    Bool,
    Int,
    Float,
    String,
    /// An opaque scalar kind registered by name (e.g. "source").
    Custom(String),
}

impl GroundTag {
    pub fn name(&self) -> &str {
        match self {
            GroundTag::Bool => "bool",
            GroundTag::Int => "int",
            GroundTag::Float => "float",
            GroundTag::String => "string",
            GroundTag::Custom(n) => n,
        }
    }
}

/// A capability demanded of a still-unresolved type.
///
/// Constraints sit on a free variable's pending list until the variable
/// resolves, at which point they are checked against the concrete type
/// (recursing through `Nullable`/`Getter`/`Meth` wrappers).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// Numeric: int or float.
    Num,
    /// Totally ordered: scalars, and lists/tuples thereof.
    Ord,
    /// Renderable as text; opaque media kinds are not.
    Printable,
    /// Only opaque media kinds qualify.
    InternalMedia,
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Num => write!(f, "a number type"),
            Constraint::Ord => write!(f, "an orderable type"),
            Constraint::Printable => write!(f, "a printable type"),
            Constraint::InternalMedia => write!(f, "an internal media type"),
        }
    }
}

/// One parameter of an arrow type.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// Whether the parameter may be omitted at call sites.
    pub optional: bool,
    /// Call-site label; empty string for unlabeled parameters.
    pub label: String,
    pub ty: TypeId,
}

impl Param {
    pub fn new(label: impl Into<String>, ty: TypeId) -> Self {
        Param { optional: false, label: label.into(), ty }
    }

    pub fn optional(label: impl Into<String>, ty: TypeId) -> Self {
        Param { optional: true, label: label.into(), ty }
    }
}

/// A polymorphic type scheme: a type plus its quantified variables.
#[derive(Clone, Debug)]
pub struct Scheme {
    pub vars: Vec<VarId>,
    pub ty: TypeId,
}

impl Scheme {
    /// A monomorphic scheme (no quantified variables).
    pub fn mono(ty: TypeId) -> Self {
        Scheme { vars: Vec::new(), ty }
    }
}

/// A method-row entry as returned by [`TypeArena::split_meths`].
#[derive(Clone, Debug)]
pub struct MethEntry {
    pub label: String,
    pub scheme: Scheme,
    pub doc: String,
    pub json_name: Option<String>,
}

/// The descriptor of a type node.
#[derive(Clone, Debug)]
pub enum TyDescr {
    Ground(GroundTag),
    /// A type variable; the cell says whether it is free or linked.
    Var(VarId),
    /// A value usable either as a constant or a zero-argument function.
    Getter(TypeId),
    List {
        elem: TypeId,
        /// Whether JSON export renders this list as an object.
        as_object: bool,
    },
    Tuple(Vec<TypeId>),
    Nullable(TypeId),
    /// One row entry stacked on a base type; rows form a singly linked
    /// list and lookup scans it front to back.
    Meth {
        label: String,
        scheme: Scheme,
        doc: String,
        json_name: Option<String>,
        /// An optional entry may be absent from a value used at this
        /// type; row subtyping skips it instead of failing.
        optional: bool,
        base: TypeId,
    },
    Arrow {
        params: Vec<Param>,
        ret: TypeId,
    },
    /// A parametric built-in constructor with per-parameter variance.
    Constr {
        name: String,
        params: Vec<(Variance, TypeId)>,
    },
}

/// A variable cell: free (with a level and pending constraints) or
/// linked to another type.
///
/// A cell is linked at most once content-wise; the only permitted
/// rewrite widens a covariant link to a larger join.
#[derive(Clone, Debug)]
pub enum VarCell {
    Free { level: u32, constraints: Vec<Constraint> },
    Link { variance: Variance, target: TypeId },
}

/// A type node: an optional source range plus a descriptor.
#[derive(Clone, Debug)]
pub struct TypeNode {
    pub span: Option<Span>,
    pub descr: TyDescr,
}

/// The mutable type graph.
pub struct TypeArena {
    nodes: Vec<TypeNode>,
    vars: Vec<VarCell>,
    customs: FxHashSet<String>,
}

impl TypeArena {
    pub fn new() -> Self {
        TypeArena { nodes: Vec::new(), vars: Vec::new(), customs: FxHashSet::default() }
    }

    // ── Node construction ───────────────────────────────────────────

    pub fn make(&mut self, descr: TyDescr) -> TypeId {
        self.make_at(descr, None)
    }

    pub fn make_at(&mut self, descr: TyDescr, span: Option<Span>) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(TypeNode { span, descr });
        id
    }

    pub fn descr(&self, id: TypeId) -> &TyDescr {
        &self.nodes[id.0 as usize].descr
    }

    pub fn span(&self, id: TypeId) -> Option<Span> {
        self.nodes[id.0 as usize].span
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Ground/composite helpers ────────────────────────────────────

    pub fn ground(&mut self, tag: GroundTag) -> TypeId {
        self.make(TyDescr::Ground(tag))
    }

    pub fn unit(&mut self) -> TypeId {
        self.make(TyDescr::Tuple(Vec::new()))
    }

    pub fn bool_(&mut self) -> TypeId {
        self.ground(GroundTag::Bool)
    }

    pub fn int(&mut self) -> TypeId {
        self.ground(GroundTag::Int)
    }

    pub fn float(&mut self) -> TypeId {
        self.ground(GroundTag::Float)
    }

    pub fn string(&mut self) -> TypeId {
        self.ground(GroundTag::String)
    }

    /// An opaque scalar kind, registered in the custom-tag table on
    /// first use.
    pub fn custom(&mut self, name: &str) -> TypeId {
        self.customs.insert(name.to_string());
        self.ground(GroundTag::Custom(name.to_string()))
    }

    /// Whether `name` names a registered opaque kind.
    pub fn is_custom(&self, name: &str) -> bool {
        self.customs.contains(name)
    }

    pub fn list(&mut self, elem: TypeId) -> TypeId {
        self.make(TyDescr::List { elem, as_object: false })
    }

    pub fn tuple(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.make(TyDescr::Tuple(elems))
    }

    pub fn nullable(&mut self, inner: TypeId) -> TypeId {
        self.make(TyDescr::Nullable(inner))
    }

    pub fn getter(&mut self, inner: TypeId) -> TypeId {
        self.make(TyDescr::Getter(inner))
    }

    pub fn arrow(&mut self, params: Vec<Param>, ret: TypeId) -> TypeId {
        self.make(TyDescr::Arrow { params, ret })
    }

    pub fn constr(&mut self, name: &str, params: Vec<(Variance, TypeId)>) -> TypeId {
        self.make(TyDescr::Constr { name: name.to_string(), params })
    }

    // ── Variables ───────────────────────────────────────────────────

    /// A fresh free variable at the given level.
    pub fn fresh_var(&mut self, level: u32) -> TypeId {
        self.fresh_var_with(level, Vec::new(), None)
    }

    pub fn fresh_var_with(
        &mut self,
        level: u32,
        constraints: Vec<Constraint>,
        span: Option<Span>,
    ) -> TypeId {
        let v = VarId(self.vars.len() as u32);
        self.vars.push(VarCell::Free { level, constraints });
        self.make_at(TyDescr::Var(v), span)
    }

    pub fn var_cell(&self, v: VarId) -> &VarCell {
        &self.vars[v.0 as usize]
    }

    /// The level of a free variable.
    ///
    /// # Panics
    ///
    /// Panics if the cell is already linked.
    pub fn var_level(&self, v: VarId) -> u32 {
        match &self.vars[v.0 as usize] {
            VarCell::Free { level, .. } => *level,
            VarCell::Link { .. } => panic!("var_level on a linked variable"),
        }
    }

    /// Lower a free variable's level.
    ///
    /// # Panics
    ///
    /// Panics if the cell is already linked.
    pub fn set_var_level(&mut self, v: VarId, level: u32) {
        match &mut self.vars[v.0 as usize] {
            VarCell::Free { level: l, .. } => *l = level,
            VarCell::Link { .. } => panic!("set_var_level on a linked variable"),
        }
    }

    /// Pending constraints of a variable; empty once linked.
    pub fn constraints_of(&self, v: VarId) -> Vec<Constraint> {
        match &self.vars[v.0 as usize] {
            VarCell::Free { constraints, .. } => constraints.clone(),
            VarCell::Link { .. } => Vec::new(),
        }
    }

    /// Attach a pending constraint to a still-free variable.
    pub fn add_constraint(&mut self, v: VarId, c: Constraint) {
        match &mut self.vars[v.0 as usize] {
            VarCell::Free { constraints, .. } => {
                if !constraints.contains(&c) {
                    constraints.push(c);
                }
            }
            VarCell::Link { .. } => panic!("add_constraint on a linked variable"),
        }
    }

    /// Link a variable to a target type.
    ///
    /// Permitted exactly on free cells, and on covariant links (the
    /// widening rewrite).
    pub fn set_link(&mut self, v: VarId, variance: Variance, target: TypeId) {
        let cell = &mut self.vars[v.0 as usize];
        debug_assert!(
            matches!(
                cell,
                VarCell::Free { .. } | VarCell::Link { variance: Variance::Covariant, .. }
            ),
            "invariant link retargeted"
        );
        *cell = VarCell::Link { variance, target };
    }

    /// Follow links to the canonical node for a type.
    pub fn deref(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.descr(id) {
                TyDescr::Var(v) => match self.var_cell(*v) {
                    VarCell::Link { target, .. } => id = *target,
                    VarCell::Free { .. } => return id,
                },
                _ => return id,
            }
        }
    }

    /// The free variable at `id`, if it is one after deref.
    pub fn as_free_var(&self, id: TypeId) -> Option<VarId> {
        match self.descr(self.deref(id)) {
            TyDescr::Var(v) => Some(*v),
            _ => None,
        }
    }

    // ── Method rows ─────────────────────────────────────────────────

    /// Prepend a row entry on a base type.
    pub fn meth(
        &mut self,
        label: impl Into<String>,
        scheme: Scheme,
        doc: impl Into<String>,
        json_name: Option<String>,
        base: TypeId,
    ) -> TypeId {
        self.meth_entry(label, scheme, doc, json_name, false, base)
    }

    /// Prepend an optional row entry: a value lacking the field may
    /// still be used where this type is expected.
    pub fn meth_opt(
        &mut self,
        label: impl Into<String>,
        scheme: Scheme,
        doc: impl Into<String>,
        json_name: Option<String>,
        base: TypeId,
    ) -> TypeId {
        self.meth_entry(label, scheme, doc, json_name, true, base)
    }

    fn meth_entry(
        &mut self,
        label: impl Into<String>,
        scheme: Scheme,
        doc: impl Into<String>,
        json_name: Option<String>,
        optional: bool,
        base: TypeId,
    ) -> TypeId {
        let span = self.span(base);
        self.make_at(
            TyDescr::Meth {
                label: label.into(),
                scheme,
                doc: doc.into(),
                json_name,
                optional,
                base,
            },
            span,
        )
    }

    /// Strip all row entries, returning the base type.
    pub fn demeth(&self, id: TypeId) -> TypeId {
        let mut t = self.deref(id);
        loop {
            match self.descr(t) {
                TyDescr::Meth { base, .. } => t = self.deref(*base),
                _ => return t,
            }
        }
    }

    /// The scheme of the first row entry matching `label`, if any.
    pub fn invoke_meth(&self, id: TypeId, label: &str) -> Option<Scheme> {
        let mut t = self.deref(id);
        loop {
            match self.descr(t) {
                TyDescr::Meth { label: l, scheme, base, .. } => {
                    if l == label {
                        return Some(scheme.clone());
                    }
                    t = self.deref(*base);
                }
                _ => return None,
            }
        }
    }

    /// Remove the first row entry matching `label`, keeping the
    /// relative order of the rest. No-op if the label is absent.
    pub fn hide_meth(&mut self, label: &str, id: TypeId) -> TypeId {
        let t = self.deref(id);
        match self.descr(t).clone() {
            TyDescr::Meth { label: l, scheme, doc, json_name, optional, base } => {
                if l == label {
                    base
                } else {
                    let hidden = self.hide_meth(label, base);
                    if hidden == self.deref(base) {
                        t
                    } else {
                        let span = self.span(t);
                        self.make_at(
                            TyDescr::Meth {
                                label: l,
                                scheme,
                                doc,
                                json_name,
                                optional,
                                base: hidden,
                            },
                            span,
                        )
                    }
                }
            }
            _ => t,
        }
    }

    /// All row entries in order, plus the base type.
    pub fn split_meths(&self, id: TypeId) -> (Vec<MethEntry>, TypeId) {
        let mut entries = Vec::new();
        let mut t = self.deref(id);
        loop {
            match self.descr(t) {
                TyDescr::Meth { label, scheme, doc, json_name, base, .. } => {
                    entries.push(MethEntry {
                        label: label.clone(),
                        scheme: scheme.clone(),
                        doc: doc.clone(),
                        json_name: json_name.clone(),
                    });
                    t = self.deref(*base);
                }
                _ => return (entries, t),
            }
        }
    }

    // ── Occur check ─────────────────────────────────────────────────

    /// Whether variable `v` occurs anywhere inside `id`.
    pub fn occurs(&self, v: VarId, id: TypeId) -> bool {
        let t = self.deref(id);
        match self.descr(t) {
            TyDescr::Var(w) => *w == v,
            TyDescr::Ground(_) => false,
            TyDescr::Getter(x) | TyDescr::Nullable(x) => self.occurs(v, *x),
            TyDescr::List { elem, .. } => self.occurs(v, *elem),
            TyDescr::Tuple(elems) => elems.iter().any(|e| self.occurs(v, *e)),
            TyDescr::Meth { scheme, base, .. } => {
                self.occurs(v, scheme.ty) || self.occurs(v, *base)
            }
            TyDescr::Arrow { params, ret } => {
                params.iter().any(|p| self.occurs(v, p.ty)) || self.occurs(v, *ret)
            }
            TyDescr::Constr { params, .. } => params.iter().any(|(_, p)| self.occurs(v, *p)),
        }
    }

    /// Whether `id` derefs to the empty tuple.
    pub fn is_unit(&self, id: TypeId) -> bool {
        matches!(self.descr(self.deref(id)), TyDescr::Tuple(elems) if elems.is_empty())
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deref_follows_link_chains() {
        let mut a = TypeArena::new();
        let i = a.int();
        let v1 = a.fresh_var(0);
        let v2 = a.fresh_var(0);
        let TyDescr::Var(c1) = *a.descr(v1) else { unreachable!() };
        let TyDescr::Var(c2) = *a.descr(v2) else { unreachable!() };
        a.set_link(c2, Variance::Invariant, i);
        a.set_link(c1, Variance::Invariant, v2);
        assert_eq!(a.deref(v1), a.deref(i));
    }

    #[test]
    fn invoke_meth_finds_first_match() {
        let mut a = TypeArena::new();
        let base = a.unit();
        let i = a.int();
        let s = a.string();
        let inner = a.meth("x", Scheme::mono(i), "", None, base);
        let outer = a.meth("x", Scheme::mono(s), "", None, inner);
        let found = a.invoke_meth(outer, "x").unwrap();
        assert_eq!(a.deref(found.ty), a.deref(s));
    }

    #[test]
    fn hide_meth_removes_only_its_entry() {
        let mut a = TypeArena::new();
        let base = a.unit();
        let i = a.int();
        let s = a.string();
        let inner = a.meth("a", Scheme::mono(i), "", None, base);
        let outer = a.meth("b", Scheme::mono(s), "", None, inner);
        let hidden = a.hide_meth("a", outer);
        assert!(a.invoke_meth(hidden, "a").is_none());
        assert!(a.invoke_meth(hidden, "b").is_some());
        // Hiding an absent label is a no-op.
        assert_eq!(a.hide_meth("zzz", outer), a.deref(outer));
    }

    #[test]
    fn split_meths_preserves_order() {
        let mut a = TypeArena::new();
        let base = a.unit();
        let i = a.int();
        let s = a.string();
        let inner = a.meth("a", Scheme::mono(i), "", None, base);
        let outer = a.meth("b", Scheme::mono(s), "", None, inner);
        let (entries, b) = a.split_meths(outer);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "b");
        assert_eq!(entries[1].label, "a");
        assert!(a.is_unit(b));
    }

    #[test]
    fn occurs_sees_through_composites() {
        let mut a = TypeArena::new();
        let v = a.fresh_var(0);
        let TyDescr::Var(cell) = *a.descr(v) else { unreachable!() };
        let l = a.list(v);
        let other = a.fresh_var(0);
        assert!(a.occurs(cell, l));
        assert!(!a.occurs(cell, other));
    }
}
