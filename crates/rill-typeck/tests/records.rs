//! Row-polymorphic records: width/depth subtyping, shadowing, open,
//! destructuring patterns.

use rill_typeck::{
    check, print_type, CheckOptions, FunParam, Pattern, PatternKind, Scheme, Term,
    TypeArena, TypeEnv, TypeError,
};

fn check_closed(term: &Term) -> Result<String, TypeError> {
    let mut arena = TypeArena::new();
    let mut env = TypeEnv::new();
    let out = check(&mut arena, &mut env, term, CheckOptions::default())?;
    Ok(print_type(&arena, out.ty))
}

#[test]
fn record_literal_types_all_fields() {
    let t = Term::record(vec![("a", Term::string("x")), ("b", Term::bool_(true))]);
    let ty = check_closed(&t).unwrap();
    // Later entries sit at the head of the row.
    assert_eq!(ty, "{b : bool, a : string}");
}

#[test]
fn duplicate_field_shadows_but_both_are_typed() {
    // {a = "old", a = true}.a : bool -- the later entry wins.
    let r = Term::record(vec![("a", Term::string("old")), ("a", Term::bool_(true))]);
    let t = Term::invoke(r, "a");
    assert_eq!(check_closed(&t).unwrap(), "bool");
}

#[test]
fn invoking_a_missing_field_reports_no_method() {
    let r = Term::record(vec![("a", Term::string("x"))]);
    let t = Term::invoke(r, "zzz");
    let err = check_closed(&t).unwrap_err();
    assert!(matches!(err, TypeError::NoMethod { ref label, .. } if label == "zzz"));
}

#[test]
fn invoke_default_on_fixed_record_without_field_fails() {
    let r = Term::record(vec![("a", Term::string("x"))]);
    let t = Term::invoke_default(r, "b", Term::string("fallback"));
    assert!(check_closed(&t).is_err());
}

#[test]
fn defaulted_invoke_through_parameter_tolerates_absent_field() {
    // fun (x) -> x.foo ?? false only demands an optional foo, so both
    // a record with the field and one without still apply.
    let f = Term::fun(
        vec![FunParam::positional("x")],
        Term::invoke_default(Term::var("x"), "foo", Term::bool_(false)),
    );
    let absent = Term::app(f.clone(), vec![("", Term::record(vec![]))]);
    assert_eq!(check_closed(&absent).unwrap(), "bool");
    let present = Term::app(
        f.clone(),
        vec![("", Term::record(vec![("foo", Term::bool_(true))]))],
    );
    assert_eq!(check_closed(&present).unwrap(), "bool");
    // A present field of the wrong type is still an error.
    let clash = Term::app(
        f,
        vec![("", Term::record(vec![("foo", Term::string("s"))]))],
    );
    assert!(check_closed(&clash).is_err());
}

#[test]
fn invoke_default_checks_against_present_field() {
    let r = Term::record(vec![("a", Term::string("x"))]);
    let good = Term::invoke_default(r.clone(), "a", Term::string("y"));
    assert_eq!(check_closed(&good).unwrap(), "string");
    let bad = Term::invoke_default(r, "a", Term::bool_(false));
    assert!(check_closed(&bad).is_err());
}

#[test]
fn function_parameter_accumulates_demanded_fields() {
    // fun (o) -> (o.name, o.ok) : the parameter's row grows open-ended.
    let body = Term::tuple(vec![
        Term::invoke(Term::var("o"), "name"),
        Term::invoke(Term::var("o"), "ok"),
    ]);
    let t = Term::fun(vec![FunParam::positional("o")], body);
    let ty = check_closed(&t).unwrap();
    assert!(ty.contains("name"), "got {ty}");
    assert!(ty.contains("ok"), "got {ty}");
    // Still open: the row sits on a free variable.
    assert!(ty.contains(".{"), "got {ty}");
}

#[test]
fn width_subtyping_accepts_wider_records() {
    // A function wanting {a : string} takes {b : bool, a : string}.
    let mut arena = TypeArena::new();
    let mut env = TypeEnv::new();
    let u = arena.unit();
    let s = arena.string();
    let want = arena.meth("a", Scheme::mono(s), "", None, u);
    let f = Term::fun(
        vec![FunParam::positional("r").with_ty(want)],
        Term::invoke(Term::var("r"), "a"),
    );
    let arg = Term::record(vec![("a", Term::string("x")), ("b", Term::bool_(true))]);
    let t = Term::app(f, vec![("", arg)]);
    let out = check(&mut arena, &mut env, &t, CheckOptions::default()).unwrap();
    assert_eq!(print_type(&arena, out.ty), "string");
}

#[test]
fn narrow_record_rejected_where_wider_expected() {
    let mut arena = TypeArena::new();
    let mut env = TypeEnv::new();
    let u = arena.unit();
    let s = arena.string();
    let b = arena.bool_();
    let inner = arena.meth("a", Scheme::mono(s), "", None, u);
    let want = arena.meth("b", Scheme::mono(b), "", None, inner);
    let f = Term::fun(vec![FunParam::positional("r").with_ty(want)], Term::unit());
    let arg = Term::record(vec![("a", Term::string("x"))]);
    let t = Term::app(f, vec![("", arg)]);
    let err = check(&mut arena, &mut env, &t, CheckOptions::default()).unwrap_err();
    assert!(matches!(err, TypeError::NoMethod { ref label, .. } if label == "b"));
}

#[test]
fn open_brings_fields_into_scope() {
    let r = Term::record(vec![("greeting", Term::string("hi")), ("count", Term::bool_(true))]);
    let t = Term::let_(
        "r",
        r,
        Term::open(Term::var("r"), Term::var("greeting")),
    );
    assert_eq!(check_closed(&t).unwrap(), "string");
}

#[test]
fn open_rejects_non_unit_base() {
    let t = Term::open(Term::string("oops"), Term::unit());
    assert!(check_closed(&t).is_err());
}

#[test]
fn tuple_pattern_destructures() {
    let t = Term::let_pat(
        Pattern::tuple(vec![Pattern::var("a"), Pattern::var("b")]),
        Term::tuple(vec![Term::string("x"), Term::bool_(true)]),
        Term::tuple(vec![Term::var("b"), Term::var("a")]),
    );
    assert_eq!(check_closed(&t).unwrap(), "(bool, string)");
}

#[test]
fn list_pattern_with_spread() {
    let t = Term::let_pat(
        Pattern {
            span: None,
            kind: PatternKind::List {
                before: vec![Pattern::var("head")],
                spread: Some("rest".into()),
                after: vec![],
            },
        },
        Term::list(vec![Term::string("a"), Term::string("b")]),
        Term::tuple(vec![Term::var("head"), Term::var("rest")]),
    );
    assert_eq!(check_closed(&t).unwrap(), "(string, [string])");
}

#[test]
fn meth_pattern_binds_fields_and_base() {
    // let {a}.r = {a = "x", b = true} in (a, r.b)
    let pat = Pattern {
        span: None,
        kind: PatternKind::Meth {
            base: Some(Box::new(Pattern::var("r"))),
            fields: vec!["a".into()],
        },
    };
    let def = Term::record(vec![("a", Term::string("x")), ("b", Term::bool_(true))]);
    let body = Term::tuple(vec![Term::var("a"), Term::invoke(Term::var("r"), "b")]);
    let t = Term::let_pat(pat, def, body);
    assert_eq!(check_closed(&t).unwrap(), "(string, bool)");
}

#[test]
fn meth_pattern_base_loses_extracted_field() {
    let pat = Pattern {
        span: None,
        kind: PatternKind::Meth {
            base: Some(Box::new(Pattern::var("r"))),
            fields: vec!["a".into()],
        },
    };
    let def = Term::record(vec![("a", Term::string("x"))]);
    let body = Term::seq(Term::var("a"), Term::invoke(Term::var("r"), "a"));
    let t = Term::let_pat(pat, def, body);
    let err = check_closed(&t).unwrap_err();
    assert!(matches!(err, TypeError::NoMethod { ref label, .. } if label == "a"));
}

#[test]
fn dotted_let_rebinds_root_with_new_field() {
    // let r = {a = "x"} in let r.b = true in (r.a, r.b)
    let inner_body = Term::tuple(vec![
        Term::invoke(Term::var("r"), "a"),
        Term::invoke(Term::var("r"), "b"),
    ]);
    let t = Term::let_(
        "r",
        Term::record(vec![("a", Term::string("x"))]),
        Term::let_pat(
            Pattern::path(vec!["r".into(), "b".into()]),
            Term::bool_(true),
            inner_body,
        ),
    );
    assert_eq!(check_closed(&t).unwrap(), "(string, bool)");
}

#[test]
fn records_survive_on_non_unit_bases() {
    // "hello".{len = true} is a string with a method.
    let t = Term::meth("len", Term::bool_(true), Term::string("hello"));
    let ty = check_closed(&t).unwrap();
    assert_eq!(ty, "string.{len : bool}");
    // It still works as a plain string.
    let mut arena = TypeArena::new();
    let mut env = TypeEnv::new();
    let s = arena.string();
    let t = Term::cast(
        Term::meth("len", Term::bool_(true), Term::string("hello")),
        s,
    );
    let out = check(&mut arena, &mut env, &t, CheckOptions::default()).unwrap();
    assert_eq!(print_type(&arena, out.ty), "string");
}
