//! Registry behavior through a session: toplevel publication, dotted
//! splicing, replacement rules.

use rill_rt::{Registry, RegistryError, Session, Value};
use rill_typeck::{Pattern, Scheme, Term, TypeArena};

#[test]
fn toplevel_bindings_survive_between_runs() {
    let mut s = Session::new().unwrap();
    s.run(&Term::let_("port", Term::int(8000), Term::unit())).unwrap();
    let out = s.run(&Term::var("port")).unwrap();
    assert_eq!(out.value.to_string(), "8000");
    // The registry holds the entry itself.
    assert!(s.registry.lookup("port").is_some());
}

#[test]
fn generalized_toplevels_stay_polymorphic() {
    let mut s = Session::new().unwrap();
    use rill_typeck::FunParam;
    let id = Term::fun(vec![FunParam::positional("x")], Term::var("x"));
    s.run(&Term::let_("id", id, Term::unit())).unwrap();
    // Usable at two different types in one later run.
    let t = Term::tuple(vec![
        Term::app(Term::var("id"), vec![("", Term::string("s"))]),
        Term::app(Term::var("id"), vec![("", Term::bool_(true))]),
    ]);
    let out = s.run(&t).unwrap();
    assert_eq!(out.value.to_string(), "(\"s\", true)");
}

#[test]
fn dotted_toplevel_let_updates_the_registered_root() {
    let mut s = Session::new().unwrap();
    let cfg = Term::record(vec![("host", Term::string("localhost"))]);
    s.run(&Term::let_("cfg", cfg, Term::unit())).unwrap();
    s.run(&Term::let_pat(
        Pattern::path(vec!["cfg".into(), "port".into()]),
        Term::int(9000),
        Term::unit(),
    ))
    .unwrap();
    // The new field is visible and the sibling survived.
    let t = Term::tuple(vec![
        Term::invoke(Term::var("cfg"), "host"),
        Term::invoke(Term::var("cfg"), "port"),
    ]);
    let out = s.run(&t).unwrap();
    assert_eq!(out.value.to_string(), "(\"localhost\", 9000)");
}

#[test]
fn rebinding_a_toplevel_shadows_the_old_value() {
    let mut s = Session::new().unwrap();
    s.run(&Term::let_("n", Term::int(1), Term::unit())).unwrap();
    s.run(&Term::let_("n", Term::int(2), Term::unit())).unwrap();
    assert_eq!(s.run(&Term::var("n")).unwrap().value.to_string(), "2");
}

#[test]
fn manual_registration_rejects_stdlib_collisions() {
    let mut s = Session::new().unwrap();
    let i = s.arena.int();
    let err = s
        .registry
        .register(&mut s.arena, "add", Scheme::mono(i), Value::int(0))
        .unwrap_err();
    assert_eq!(err, RegistryError::Occupied("add".into()));
}

#[test]
fn modules_grow_field_by_field() {
    let mut arena = TypeArena::new();
    let reg = Registry::new();
    reg.register_module(&mut arena, "net").unwrap();
    let s = arena.string();
    reg.register(&mut arena, "net.host", Scheme::mono(s), Value::string("a")).unwrap();
    let i = arena.int();
    reg.register(&mut arena, "net.port", Scheme::mono(i), Value::int(80)).unwrap();

    let entry = reg.lookup("net").unwrap();
    assert!(entry.value.invoke_meth("host").is_some());
    assert!(entry.value.invoke_meth("port").is_some());
    assert!(arena.invoke_meth(entry.scheme.ty, "host").is_some());
    assert!(arena.invoke_meth(entry.scheme.ty, "port").is_some());

    // Re-registering a leaf without replace is refused.
    let i = arena.int();
    let err =
        reg.register(&mut arena, "net.port", Scheme::mono(i), Value::int(81)).unwrap_err();
    assert_eq!(err, RegistryError::Occupied("net.port".into()));
    let i = arena.int();
    reg.register_replace(&mut arena, "net.port", Scheme::mono(i), Value::int(81)).unwrap();
    assert_eq!(
        reg.lookup("net").unwrap().value.invoke_meth("port").unwrap().to_string(),
        "81"
    );
}
