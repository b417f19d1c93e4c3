//! Type schemes for the bootstrap builtins.
//!
//! The runtime pairs each of these with a native implementation when it
//! populates the registry; keeping the scheme constructors here means
//! the type side of a builtin lives next to the machinery that checks
//! calls against it.

use crate::ty::{Constraint, Param, Scheme, TypeArena, TypeId, VarId, Variance};

/// A quantified variable carrying constraints, ready to be listed in a
/// scheme.
fn scheme_var(arena: &mut TypeArena, constraints: Vec<Constraint>) -> (VarId, TypeId) {
    let t = arena.fresh_var_with(1, constraints, None);
    let v = arena.as_free_var(t).unwrap();
    (v, t)
}

/// `('a, 'a) -> 'a` where `'a` is numeric. Addition, subtraction and
/// friends.
pub fn num_binop(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, vec![Constraint::Num]);
    let ty = arena.arrow(vec![Param::new("", a), Param::new("", a)], a);
    Scheme { vars: vec![v], ty }
}

/// `('a) -> 'a` where `'a` is numeric. Negation.
pub fn num_unop(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, vec![Constraint::Num]);
    let ty = arena.arrow(vec![Param::new("", a)], a);
    Scheme { vars: vec![v], ty }
}

/// `('a, 'a) -> bool` where `'a` is orderable. Comparisons.
pub fn compare(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, vec![Constraint::Ord]);
    let b = arena.bool_();
    let ty = arena.arrow(vec![Param::new("", a), Param::new("", a)], b);
    Scheme { vars: vec![v], ty }
}

/// `('a) -> string` where `'a` is printable.
pub fn string_of(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, vec![Constraint::Printable]);
    let s = arena.string();
    let ty = arena.arrow(vec![Param::new("", a)], s);
    Scheme { vars: vec![v], ty }
}

/// The reference constructor type `ref('a)`; its parameter is invariant
/// because references are read and written.
pub fn ref_ty(arena: &mut TypeArena, elem: TypeId) -> TypeId {
    arena.constr("ref", vec![(Variance::Invariant, elem)])
}

/// `('a) -> ref('a)`.
pub fn ref_make(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, Vec::new());
    let r = ref_ty(arena, a);
    let ty = arena.arrow(vec![Param::new("", a)], r);
    Scheme { vars: vec![v], ty }
}

/// `(ref('a)) -> 'a`.
pub fn ref_get(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, Vec::new());
    let r = ref_ty(arena, a);
    let ty = arena.arrow(vec![Param::new("", r)], a);
    Scheme { vars: vec![v], ty }
}

/// `(ref('a), 'a) -> unit`.
pub fn ref_set(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, Vec::new());
    let r = ref_ty(arena, a);
    let u = arena.unit();
    let ty = arena.arrow(vec![Param::new("", r), Param::new("", a)], u);
    Scheme { vars: vec![v], ty }
}

/// `({'a}) -> 'a` -- resolve a getter (constant or thunk) to its value.
pub fn getter_get(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, Vec::new());
    let g = arena.getter(a);
    let ty = arena.arrow(vec![Param::new("", g)], a);
    Scheme { vars: vec![v], ty }
}

/// `(['a], ['a]) -> ['a]`.
pub fn list_append(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, Vec::new());
    let l1 = arena.list(a);
    let l2 = arena.list(a);
    let l3 = arena.list(a);
    let ty = arena.arrow(vec![Param::new("", l1), Param::new("", l2)], l3);
    Scheme { vars: vec![v], ty }
}

/// `((('a) -> 'b), ['a]) -> ['b]`.
pub fn list_map(arena: &mut TypeArena) -> Scheme {
    let (va, a) = scheme_var(arena, Vec::new());
    let (vb, b) = scheme_var(arena, Vec::new());
    let f = arena.arrow(vec![Param::new("", a)], b);
    let la = arena.list(a);
    let lb = arena.list(b);
    let ty = arena.arrow(vec![Param::new("", f), Param::new("", la)], lb);
    Scheme { vars: vec![va, vb], ty }
}

/// The record type carried by a caught error:
/// `{kind : string, message : string}`.
pub fn error_record(arena: &mut TypeArena) -> TypeId {
    let u = arena.unit();
    let s1 = arena.string();
    let s2 = arena.string();
    let inner = arena.meth("message", Scheme::mono(s2), "", None, u);
    arena.meth("kind", Scheme::mono(s1), "", None, inner)
}

/// `(?~kind : string, string) -> 'a` -- raising never returns, so the
/// result unifies with anything.
pub fn error_raise(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, Vec::new());
    let kind = arena.string();
    let msg = arena.string();
    let ty = arena.arrow(vec![Param::optional("kind", kind), Param::new("", msg)], a);
    Scheme { vars: vec![v], ty }
}

/// `(?~kinds : [string], (() -> 'a), (({kind : string, ...}) -> 'a)) -> 'a`.
///
/// Runs the thunk; a raised error whose kind passes the optional
/// allow-list is handed to the handler, anything else propagates.
pub fn error_catch(arena: &mut TypeArena) -> Scheme {
    let (v, a) = scheme_var(arena, Vec::new());
    let s = arena.string();
    let kinds = arena.list(s);
    let thunk = arena.arrow(vec![], a);
    let err = error_record(arena);
    let handler = arena.arrow(vec![Param::new("", err)], a);
    let ty = arena.arrow(
        vec![
            Param::optional("kinds", kinds),
            Param::new("", thunk),
            Param::new("", handler),
        ],
        a,
    );
    Scheme { vars: vec![v], ty }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretty::print_scheme;

    #[test]
    fn scheme_notation() {
        let mut a = TypeArena::new();
        let s = num_binop(&mut a);
        assert_eq!(print_scheme(&a, &s), "('a, 'a) -> 'a");
        let s = compare(&mut a);
        assert_eq!(print_scheme(&a, &s), "('a, 'a) -> bool");
        let s = string_of(&mut a);
        assert_eq!(print_scheme(&a, &s), "('a) -> string");
        let s = ref_make(&mut a);
        assert_eq!(print_scheme(&a, &s), "('a) -> ref('a)");
    }

    #[test]
    fn quantified_vars_carry_constraints() {
        let mut a = TypeArena::new();
        let s = num_binop(&mut a);
        assert_eq!(s.vars.len(), 1);
        assert_eq!(a.constraints_of(s.vars[0]), vec![Constraint::Num]);
    }

    #[test]
    fn error_catch_notation() {
        let mut a = TypeArena::new();
        let s = error_catch(&mut a);
        assert_eq!(
            print_scheme(&a, &s),
            "(?~kinds : [string], () -> 'a, ({kind : string, message : string}) -> 'a) -> 'a"
        );
    }
}
