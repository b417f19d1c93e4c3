//! End-to-end runs: check then evaluate against the bootstrap stdlib.

use rill_rt::{Session, SessionError, Value};
use rill_typeck::{FunParam, Term};

fn run(session: &mut Session, term: &Term) -> Result<String, SessionError> {
    Ok(session.run(term)?.value.to_string())
}

#[test]
fn arithmetic_stays_integral_until_a_float_appears() {
    let mut s = Session::new().unwrap();
    let t = Term::app(Term::var("add"), vec![("", Term::int(2)), ("", Term::int(3))]);
    assert_eq!(run(&mut s, &t).unwrap(), "5");
    let t = Term::app(Term::var("add"), vec![("", Term::float(1.5)), ("", Term::int(2))]);
    assert_eq!(run(&mut s, &t).unwrap(), "3.5");
}

#[test]
fn literals_widen_under_a_float_context() {
    // [1, 2.0] forces the whole list to float, including the evaluated
    // first element.
    let mut s = Session::new().unwrap();
    let t = Term::list(vec![Term::int(1), Term::float(2.0)]);
    assert_eq!(run(&mut s, &t).unwrap(), "[1.0, 2.0]");
    let t = Term::list(vec![Term::float(2.0), Term::int(1)]);
    assert_eq!(run(&mut s, &t).unwrap(), "[2.0, 1.0]");
}

#[test]
fn shadowed_record_field_reads_the_later_entry() {
    let mut s = Session::new().unwrap();
    let r = Term::record(vec![("a", Term::int(1)), ("a", Term::int(2))]);
    assert_eq!(run(&mut s, &Term::invoke(r.clone(), "a")).unwrap(), "2");
    // Both entries are physically present in the value.
    let v = s.run(&r).unwrap().value;
    let (entries, _) = v.split_meths();
    assert_eq!(entries.len(), 2);
}

#[test]
fn partial_application_waits_for_mandatory_labels() {
    let mut s = Session::new().unwrap();
    let body = Term::app(Term::var("add"), vec![("", Term::var("x")), ("", Term::var("y"))]);
    let f = Term::fun(
        vec![
            FunParam::labeled("x").with_default(Term::int(0)),
            FunParam::labeled("y"),
        ],
        body,
    );
    let t = Term::let_(
        "f",
        f,
        Term::let_(
            "g",
            Term::app(Term::var("f"), vec![("x", Term::int(5))]),
            Term::app(Term::var("g"), vec![("y", Term::int(2))]),
        ),
    );
    assert_eq!(run(&mut s, &t).unwrap(), "7");
}

#[test]
fn omitted_optional_arguments_take_their_defaults() {
    let mut s = Session::new().unwrap();
    let f = Term::fun(
        vec![FunParam::labeled("greeting").with_default(Term::string("hi"))],
        Term::var("greeting"),
    );
    let t = Term::let_("f", f.clone(), Term::app(Term::var("f"), vec![]));
    assert_eq!(run(&mut s, &t).unwrap(), "\"hi\"");
    let t = Term::let_(
        "f",
        f,
        Term::app(Term::var("f"), vec![("greeting", Term::string("yo"))]),
    );
    assert_eq!(run(&mut s, &t).unwrap(), "\"yo\"");
}

#[test]
fn references_share_one_cell() {
    let mut s = Session::new().unwrap();
    let t = Term::let_(
        "r",
        Term::app(Term::var("ref"), vec![("", Term::int(0))]),
        Term::seq(
            Term::app(
                Term::invoke(Term::var("ref"), "set"),
                vec![("", Term::var("r")), ("", Term::int(5))],
            ),
            Term::app(Term::invoke(Term::var("ref"), "get"), vec![("", Term::var("r"))]),
        ),
    );
    assert_eq!(run(&mut s, &t).unwrap(), "5");
}

#[test]
fn getter_get_resolves_constants_and_thunks() {
    let mut s = Session::new().unwrap();
    let get = Term::invoke(Term::var("getter"), "get");
    let thunk = Term::fun(vec![], Term::int(42));
    let t = Term::app(get.clone(), vec![("", thunk)]);
    assert_eq!(run(&mut s, &t).unwrap(), "42");
    let t = Term::app(get, vec![("", Term::int(7))]);
    assert_eq!(run(&mut s, &t).unwrap(), "7");
}

#[test]
fn string_of_prints_strings_raw() {
    let mut s = Session::new().unwrap();
    let t = Term::app(Term::var("string_of"), vec![("", Term::string("hi"))]);
    assert!(matches!(
        s.run(&t).unwrap().value,
        Value::Ground(rill_rt::GroundVal::String(ref inner)) if inner == "hi"
    ));
    let t = Term::app(Term::var("string_of"), vec![("", Term::int(3))]);
    assert!(matches!(
        s.run(&t).unwrap().value,
        Value::Ground(rill_rt::GroundVal::String(ref inner)) if inner == "3"
    ));
}

#[test]
fn list_map_calls_back_into_script_code() {
    let mut s = Session::new().unwrap();
    let double = Term::fun(
        vec![FunParam::positional("x")],
        Term::app(Term::var("add"), vec![("", Term::var("x")), ("", Term::var("x"))]),
    );
    let t = Term::app(
        Term::invoke(Term::var("list"), "map"),
        vec![("", double), ("", Term::list(vec![Term::int(1), Term::int(2)]))],
    );
    assert_eq!(run(&mut s, &t).unwrap(), "[2, 4]");
}

#[test]
fn raised_errors_are_caught_by_kind() {
    let mut s = Session::new().unwrap();
    let raise = Term::app(
        Term::invoke(Term::var("error"), "raise"),
        vec![("kind", Term::string("net")), ("", Term::string("down"))],
    );
    let handler = Term::fun(
        vec![FunParam::positional("e")],
        Term::invoke(Term::var("e"), "message"),
    );
    let t = Term::app(
        Term::invoke(Term::var("error"), "catch"),
        vec![
            ("kinds", Term::list(vec![Term::string("net")])),
            ("", Term::fun(vec![], raise)),
            ("", handler),
        ],
    );
    assert_eq!(run(&mut s, &t).unwrap(), "\"down\"");
}

#[test]
fn errors_outside_the_allow_list_propagate() {
    let mut s = Session::new().unwrap();
    // Default kind is "error"; the handler only accepts "net".
    let raise = Term::app(
        Term::invoke(Term::var("error"), "raise"),
        vec![("", Term::string("boom"))],
    );
    let handler = Term::fun(
        vec![FunParam::positional("e")],
        Term::invoke(Term::var("e"), "message"),
    );
    let t = Term::app(
        Term::invoke(Term::var("error"), "catch"),
        vec![
            ("kinds", Term::list(vec![Term::string("net")])),
            ("", Term::fun(vec![], raise)),
            ("", handler),
        ],
    );
    match s.run(&t) {
        Err(SessionError::Runtime(e)) => {
            assert_eq!(e.kind, "error");
            assert_eq!(e.message, "boom");
        }
        other => panic!("expected a runtime error, got {:?}", other.map(|o| o.value)),
    }
}

#[test]
fn recursive_functions_call_themselves() {
    let mut s = Session::new().unwrap();
    // The self name is in scope inside the body even though nothing
    // else binds it.
    let body = Term::seq(Term::var("loop"), Term::var("n"));
    let f = Term::rfun("loop", vec![FunParam::positional("n")], body);
    let t = Term::let_("loop", f, Term::app(Term::var("loop"), vec![("", Term::int(3))]));
    assert_eq!(run(&mut s, &t).unwrap(), "3");
}

#[test]
fn destructuring_lets_bind_at_runtime() {
    use rill_typeck::{Pattern, PatternKind};
    let mut s = Session::new().unwrap();
    let pat = Pattern {
        span: None,
        kind: PatternKind::List {
            before: vec![Pattern::var("head")],
            spread: Some("rest".into()),
            after: vec![],
        },
    };
    let t = Term::let_pat(
        pat,
        Term::list(vec![Term::int(1), Term::int(2), Term::int(3)]),
        Term::tuple(vec![Term::var("head"), Term::var("rest")]),
    );
    assert_eq!(run(&mut s, &t).unwrap(), "(1, [2, 3])");
}
