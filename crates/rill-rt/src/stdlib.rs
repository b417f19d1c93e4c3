//! The bootstrap standard library: native implementations paired with
//! the schemes from `rill_typeck::builtins` and installed into a
//! [`Registry`].

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use rill_typeck::builtins;
use rill_typeck::TypeArena;

use crate::error::{RuntimeError, RuntimeResult};
use crate::eval::Evaluator;
use crate::registry::{Registry, RegistryError};
use crate::value::{FfiParam, FfiValue, GroundVal, Value};

fn ffi(
    name: &str,
    params: Vec<FfiParam>,
    call: impl Fn(&mut Evaluator<'_>, Vec<(String, Value)>) -> RuntimeResult<Value> + 'static,
) -> Value {
    Value::Ffi(Rc::new(FfiValue::new(name, params, call)))
}

fn pos() -> FfiParam {
    FfiParam::required("")
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Ground(GroundVal::Int(i)) => Some(*i as f64),
        Value::Ground(GroundVal::Float(x)) => Some(*x),
        _ => None,
    }
}

fn expect_string(v: &Value, who: &str) -> RuntimeResult<String> {
    match v.demeth() {
        Value::Ground(GroundVal::String(s)) => Ok(s.clone()),
        other => Err(RuntimeError::type_error(format!("{who} expects a string, got {other}"))),
    }
}

/// Arithmetic stays in the integers until a float appears; mixed
/// operands widen.
fn arith(
    name: &'static str,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    ffi(name, vec![pos(), pos()], move |_ev, args| {
        let a = args[0].1.demeth();
        let b = args[1].1.demeth();
        if let (Value::Ground(GroundVal::Int(x)), Value::Ground(GroundVal::Int(y))) = (a, b) {
            return Ok(Value::int(int_op(*x, *y)));
        }
        match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => Ok(Value::float(float_op(x, y))),
            _ => Err(RuntimeError::type_error(format!(
                "{name} expects numbers, got {a} and {b}"
            ))),
        }
    })
}

/// Structural ordering over comparable values.
fn order(a: &Value, b: &Value) -> RuntimeResult<Ordering> {
    let incomparable =
        || RuntimeError::type_error(format!("{a} and {b} are not comparable"));
    match (a.demeth(), b.demeth()) {
        (Value::Ground(GroundVal::Bool(x)), Value::Ground(GroundVal::Bool(y))) => {
            Ok(x.cmp(y))
        }
        (Value::Ground(GroundVal::String(x)), Value::Ground(GroundVal::String(y))) => {
            Ok(x.cmp(y))
        }
        (Value::Tuple(xs), Value::Tuple(ys)) if xs.len() == ys.len() => {
            for (x, y) in xs.iter().zip(ys) {
                match order(x, y)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Ok(Ordering::Equal)
        }
        (Value::List(xs), Value::List(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                match order(x, y)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Ok(xs.len().cmp(&ys.len()))
        }
        (x, y) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(incomparable),
            _ => Err(incomparable()),
        },
    }
}

fn error_value(e: &RuntimeError) -> Value {
    let base = Value::Meth {
        label: "message".into(),
        value: Box::new(Value::string(e.message.clone())),
        rest: Box::new(Value::unit()),
    };
    Value::Meth {
        label: "kind".into(),
        value: Box::new(Value::string(e.kind.clone())),
        rest: Box::new(base),
    }
}

/// Install the bootstrap bindings. Call once per registry.
pub fn install(arena: &mut TypeArena, registry: &Registry) -> Result<(), RegistryError> {
    // ── Arithmetic and comparison ───────────────────────────────────
    let s = builtins::num_binop(arena);
    registry.register(arena, "add", s, arith("add", i64::wrapping_add, |a, b| a + b))?;
    let s = builtins::num_binop(arena);
    registry.register(arena, "sub", s, arith("sub", i64::wrapping_sub, |a, b| a - b))?;
    let s = builtins::num_binop(arena);
    registry.register(arena, "mul", s, arith("mul", i64::wrapping_mul, |a, b| a * b))?;
    let s = builtins::num_unop(arena);
    let neg = ffi("neg", vec![pos()], |_ev, args| match args[0].1.demeth() {
        Value::Ground(GroundVal::Int(i)) => Ok(Value::int(i.wrapping_neg())),
        Value::Ground(GroundVal::Float(x)) => Ok(Value::float(-x)),
        other => Err(RuntimeError::type_error(format!("neg expects a number, got {other}"))),
    });
    registry.register(arena, "neg", s, neg)?;

    let s = builtins::compare(arena);
    let lt = ffi("lt", vec![pos(), pos()], |_ev, args| {
        Ok(Value::bool_(order(&args[0].1, &args[1].1)? == Ordering::Less))
    });
    registry.register(arena, "lt", s, lt)?;

    // ── Printing ────────────────────────────────────────────────────
    let s = builtins::string_of(arena);
    let string_of = ffi("string_of", vec![pos()], |_ev, args| {
        let v = &args[0].1;
        // A toplevel string renders raw; everything else uses the
        // value notation.
        Ok(Value::string(match v.demeth() {
            Value::Ground(GroundVal::String(s)) => s.clone(),
            _ => v.to_string(),
        }))
    });
    registry.register(arena, "string_of", s, string_of)?;

    // ── References ──────────────────────────────────────────────────
    let s = builtins::ref_make(arena);
    let ref_make = ffi("ref", vec![pos()], |_ev, args| {
        let v = args.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null);
        Ok(Value::Ref(Rc::new(RefCell::new(v))))
    });
    registry.register(arena, "ref", s, ref_make)?;

    let s = builtins::ref_get(arena);
    let ref_get = ffi("ref.get", vec![pos()], |_ev, args| match args[0].1.demeth() {
        Value::Ref(r) => Ok(r.borrow().clone()),
        other => Err(RuntimeError::type_error(format!("{other} is not a reference"))),
    });
    registry.register(arena, "ref.get", s, ref_get)?;

    let s = builtins::ref_set(arena);
    let ref_set = ffi("ref.set", vec![pos(), pos()], |_ev, args| {
        let mut it = args.into_iter();
        let r = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
        let v = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
        match r.demeth() {
            Value::Ref(cell) => {
                *cell.borrow_mut() = v;
                Ok(Value::unit())
            }
            other => Err(RuntimeError::type_error(format!("{other} is not a reference"))),
        }
    });
    registry.register(arena, "ref.set", s, ref_set)?;

    // ── Getters ─────────────────────────────────────────────────────
    registry.register_module(arena, "getter")?;
    let s = builtins::getter_get(arena);
    let getter_get = ffi("getter.get", vec![pos()], |ev, args| {
        let v = args.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null);
        let callable = matches!(v.demeth(), Value::Fun(_) | Value::Ffi(_));
        if callable {
            ev.apply(v, Vec::new())
        } else {
            Ok(v)
        }
    });
    registry.register(arena, "getter.get", s, getter_get)?;

    // ── Lists ───────────────────────────────────────────────────────
    registry.register_module(arena, "list")?;
    let s = builtins::list_append(arena);
    let append = ffi("list.append", vec![pos(), pos()], |_ev, args| {
        let mut it = args.into_iter();
        let a = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
        let b = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
        match (a.demeth(), b.demeth()) {
            (Value::List(xs), Value::List(ys)) => {
                let mut out = xs.clone();
                out.extend(ys.iter().cloned());
                Ok(Value::List(out))
            }
            _ => Err(RuntimeError::type_error(format!("cannot append {a} and {b}"))),
        }
    });
    registry.register(arena, "list.append", s, append)?;

    let s = builtins::list_map(arena);
    let map = ffi("list.map", vec![pos(), pos()], |ev, args| {
        let mut it = args.into_iter();
        let f = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
        let l = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
        let items = match l.demeth() {
            Value::List(vs) => vs.clone(),
            other => return Err(RuntimeError::type_error(format!("{other} is not a list"))),
        };
        let mut out = Vec::with_capacity(items.len());
        for x in items {
            out.push(ev.apply(f.clone(), vec![(String::new(), x)])?);
        }
        Ok(Value::List(out))
    });
    registry.register(arena, "list.map", s, map)?;

    // ── Errors ──────────────────────────────────────────────────────
    registry.register_module(arena, "error")?;
    let s = builtins::error_raise(arena);
    let raise = ffi(
        "error.raise",
        vec![FfiParam::optional("kind", Value::string("error")), pos()],
        |_ev, args| {
            let kind = expect_string(&args[0].1, "error.raise")?;
            let message = expect_string(&args[1].1, "error.raise")?;
            Err(RuntimeError::new(kind, message))
        },
    );
    registry.register(arena, "error.raise", s, raise)?;

    let s = builtins::error_catch(arena);
    let catch = ffi(
        "error.catch",
        vec![FfiParam::optional("kinds", Value::Null), pos(), pos()],
        |ev, args| {
            let mut it = args.into_iter();
            let kinds = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
            let thunk = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
            let handler = it.next().map(|(_, v)| v).unwrap_or(Value::Null);
            match ev.apply(thunk, Vec::new()) {
                Ok(v) => Ok(v),
                Err(e) => {
                    let caught = match kinds.demeth() {
                        Value::List(ks) => ks.iter().any(|k| {
                            matches!(k.demeth(),
                                Value::Ground(GroundVal::String(s)) if *s == e.kind)
                        }),
                        // No allow-list: catch everything.
                        _ => true,
                    };
                    if caught {
                        ev.apply(handler, vec![(String::new(), error_value(&e))])
                    } else {
                        Err(e)
                    }
                }
            }
        },
    );
    registry.register(arena, "error.catch", s, catch)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_structural() {
        let a = Value::List(vec![Value::int(1), Value::int(2)]);
        let b = Value::List(vec![Value::int(1), Value::int(3)]);
        assert_eq!(order(&a, &b).unwrap(), Ordering::Less);
        let short = Value::List(vec![Value::int(1)]);
        assert_eq!(order(&short, &a).unwrap(), Ordering::Less);
    }

    #[test]
    fn mixed_numerics_compare_as_floats() {
        assert_eq!(order(&Value::int(2), &Value::float(2.5)).unwrap(), Ordering::Less);
    }

    #[test]
    fn functions_are_not_comparable() {
        let f = ffi("f", vec![], |_ev, _args| Ok(Value::unit()));
        assert!(order(&f, &f).is_err());
    }

    #[test]
    fn install_registers_modules_with_fields() {
        let mut arena = TypeArena::new();
        let reg = Registry::new();
        install(&mut arena, &reg).unwrap();
        let error = reg.lookup("error").unwrap();
        assert!(error.value.invoke_meth("raise").is_some());
        assert!(error.value.invoke_meth("catch").is_some());
        assert!(arena.invoke_meth(error.scheme.ty, "raise").is_some());
        assert!(reg.lookup("ref").unwrap().value.invoke_meth("set").is_some());
    }
}
