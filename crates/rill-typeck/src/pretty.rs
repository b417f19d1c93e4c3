//! Stable textual notation for types.
//!
//! `(int, string) -> float`, `{foo : int, bar : string}`, `'a -> 'a`,
//! `int?`, `{string}` for a getter. The printer first lowers a type to
//! a [`Repr`] tree -- error reporting reuses the same tree, replacing
//! unrelated substructure with [`Repr::Ellipsis`] so that a mismatch
//! deep inside a composite still reads locally.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::ty::{Scheme, TyDescr, TypeArena, TypeId, VarId};

/// A printable snapshot of a type.
#[derive(Clone, Debug, PartialEq)]
pub enum Repr {
    /// Stands in for substructure unrelated to the point of interest.
    Ellipsis,
    Ground(String),
    /// A free variable, already named (`'a`, `'b`, ...).
    Var(String),
    Getter(Box<Repr>),
    List(Box<Repr>),
    Nullable(Box<Repr>),
    Tuple(Vec<Repr>),
    Meth {
        label: String,
        optional: bool,
        field: Box<Repr>,
        base: Box<Repr>,
    },
    Arrow {
        params: Vec<(bool, String, Repr)>,
        ret: Box<Repr>,
    },
    Constr {
        name: String,
        params: Vec<Repr>,
    },
}

impl Repr {
    /// Wrap in a list context: `[self]`.
    pub fn in_list(self) -> Repr {
        Repr::List(Box::new(self))
    }

    /// Wrap in a tuple context with `Ellipsis` siblings.
    pub fn in_tuple(self, idx: usize, arity: usize) -> Repr {
        let mut elems = vec![Repr::Ellipsis; arity];
        elems[idx] = self;
        Repr::Tuple(elems)
    }

    pub fn in_nullable(self) -> Repr {
        Repr::Nullable(Box::new(self))
    }

    pub fn in_getter(self) -> Repr {
        Repr::Getter(Box::new(self))
    }

    /// Wrap as the field of a row entry, eliding the rest of the row.
    pub fn in_meth(self, label: &str) -> Repr {
        Repr::Meth {
            label: label.to_string(),
            optional: false,
            field: Box::new(self),
            base: Box::new(Repr::Ellipsis),
        }
    }

    /// Wrap as one parameter of an arrow, eliding the rest.
    pub fn in_arrow_param(self, optional: bool, label: &str) -> Repr {
        Repr::Arrow {
            params: vec![(optional, label.to_string(), self)],
            ret: Box::new(Repr::Ellipsis),
        }
    }

    /// Wrap as the result of an arrow, eliding the parameters.
    pub fn in_arrow_ret(self) -> Repr {
        Repr::Arrow { params: vec![(false, String::new(), Repr::Ellipsis)], ret: Box::new(self) }
    }

    pub fn in_constr(self, name: &str, idx: usize, arity: usize) -> Repr {
        let mut params = vec![Repr::Ellipsis; arity];
        params[idx] = self;
        Repr::Constr { name: name.to_string(), params }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::Ellipsis => write!(f, "..."),
            Repr::Ground(name) => write!(f, "{name}"),
            Repr::Var(name) => write!(f, "{name}"),
            Repr::Getter(inner) => write!(f, "{{{inner}}}"),
            Repr::List(inner) => write!(f, "[{inner}]"),
            Repr::Nullable(inner) => {
                if matches!(**inner, Repr::Arrow { .. }) {
                    write!(f, "({inner})?")
                } else {
                    write!(f, "{inner}?")
                }
            }
            Repr::Tuple(elems) => {
                if elems.is_empty() {
                    return write!(f, "unit");
                }
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Repr::Meth { .. } => {
                // Gather the whole row so `{a : int, b : string}` prints
                // as one record.
                let mut fields = Vec::new();
                let mut cur = self;
                while let Repr::Meth { label, optional, field, base } = cur {
                    fields.push((label, *optional, field));
                    cur = base;
                }
                let plain_base =
                    matches!(cur, Repr::Tuple(elems) if elems.is_empty()) || matches!(cur, Repr::Ellipsis);
                if !plain_base {
                    write!(f, "{cur}.")?;
                }
                write!(f, "{{")?;
                for (i, (label, optional, field)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let mark = if *optional { "?" } else { "" };
                    write!(f, "{label}{mark} : {field}")?;
                }
                if matches!(cur, Repr::Ellipsis) {
                    if !fields.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, "}}")
            }
            Repr::Arrow { params, ret } => {
                write!(f, "(")?;
                for (i, (optional, label, ty)) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if *optional {
                        write!(f, "?")?;
                    }
                    if !label.is_empty() {
                        write!(f, "~{label} : ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ") -> {ret}")
            }
            Repr::Constr { name, params } => {
                write!(f, "{name}(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Lowers types to [`Repr`], naming free variables in order of first
/// appearance so that both sides of an error share one naming.
pub struct ReprBuilder<'a> {
    arena: &'a TypeArena,
    names: FxHashMap<VarId, String>,
}

impl<'a> ReprBuilder<'a> {
    pub fn new(arena: &'a TypeArena) -> Self {
        ReprBuilder { arena, names: FxHashMap::default() }
    }

    fn var_name(&mut self, v: VarId) -> String {
        if let Some(n) = self.names.get(&v) {
            return n.clone();
        }
        let i = self.names.len();
        // 'a .. 'z, then 'a1, 'b1, ...
        let letter = (b'a' + (i % 26) as u8) as char;
        let suffix = i / 26;
        let name = if suffix == 0 {
            format!("'{letter}")
        } else {
            format!("'{letter}{suffix}")
        };
        self.names.insert(v, name.clone());
        name
    }

    pub fn repr(&mut self, id: TypeId) -> Repr {
        let t = self.arena.deref(id);
        match self.arena.descr(t).clone() {
            TyDescr::Ground(g) => Repr::Ground(g.name().to_string()),
            TyDescr::Var(v) => Repr::Var(self.var_name(v)),
            TyDescr::Getter(inner) => Repr::Getter(Box::new(self.repr(inner))),
            TyDescr::List { elem, .. } => Repr::List(Box::new(self.repr(elem))),
            TyDescr::Nullable(inner) => Repr::Nullable(Box::new(self.repr(inner))),
            TyDescr::Tuple(elems) => {
                Repr::Tuple(elems.into_iter().map(|e| self.repr(e)).collect())
            }
            TyDescr::Meth { label, scheme, optional, base, .. } => Repr::Meth {
                label,
                optional,
                field: Box::new(self.scheme_repr(&scheme)),
                base: Box::new(self.repr(base)),
            },
            TyDescr::Arrow { params, ret } => Repr::Arrow {
                params: params
                    .into_iter()
                    .map(|p| (p.optional, p.label, self.repr(p.ty)))
                    .collect(),
                ret: Box::new(self.repr(ret)),
            },
            TyDescr::Constr { name, params } => Repr::Constr {
                name,
                params: params.into_iter().map(|(_, p)| self.repr(p)).collect(),
            },
        }
    }

    /// The body of a scheme; quantified variables get names like any
    /// other free variable.
    pub fn scheme_repr(&mut self, scheme: &Scheme) -> Repr {
        self.repr(scheme.ty)
    }
}

/// One-shot printer for a type.
pub fn print_type(arena: &TypeArena, id: TypeId) -> String {
    ReprBuilder::new(arena).repr(id).to_string()
}

/// One-shot printer for a scheme.
pub fn print_scheme(arena: &TypeArena, scheme: &Scheme) -> String {
    ReprBuilder::new(arena).scheme_repr(scheme).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{Param, Scheme};

    #[test]
    fn arrow_notation() {
        let mut a = TypeArena::new();
        let i = a.int();
        let s = a.string();
        let fl = a.float();
        let arr = a.arrow(vec![Param::new("", i), Param::new("", s)], fl);
        assert_eq!(print_type(&a, arr), "(int, string) -> float");
    }

    #[test]
    fn labeled_and_optional_params() {
        let mut a = TypeArena::new();
        let i = a.int();
        let fl = a.float();
        let u = a.unit();
        let arr = a.arrow(vec![Param::new("x", i), Param::optional("y", fl)], u);
        assert_eq!(print_type(&a, arr), "(~x : int, ?~y : float) -> unit");
    }

    #[test]
    fn record_notation() {
        let mut a = TypeArena::new();
        let u = a.unit();
        let i = a.int();
        let s = a.string();
        let inner = a.meth("bar", Scheme::mono(s), "", None, u);
        let rec = a.meth("foo", Scheme::mono(i), "", None, inner);
        assert_eq!(print_type(&a, rec), "{foo : int, bar : string}");
    }

    #[test]
    fn vars_named_in_order() {
        let mut a = TypeArena::new();
        let v = a.fresh_var(0);
        let arr = a.arrow(vec![Param::new("", v)], v);
        assert_eq!(print_type(&a, arr), "('a) -> 'a");
    }

    #[test]
    fn nullable_getter_list() {
        let mut a = TypeArena::new();
        let i = a.int();
        let n = a.nullable(i);
        assert_eq!(print_type(&a, n), "int?");
        let s = a.string();
        let g = a.getter(s);
        assert_eq!(print_type(&a, g), "{string}");
        let l = a.list(i);
        assert_eq!(print_type(&a, l), "[int]");
    }
}
