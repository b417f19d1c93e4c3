//! Runtime values.
//!
//! Values mirror the type layer: ground scalars, lists, tuples (unit is
//! the empty tuple), nullable `Null`, references as shared boxes,
//! method chains, and two callable shapes -- script closures and native
//! builtins. Opaque media objects hide behind [`ExternalValue`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rill_typeck::{FunDef, TyDescr, TypeArena, TypeId};
use serde_json::Value as Json;

use crate::error::RuntimeResult;
use crate::eval::Evaluator;

/// A ground scalar value.
#[derive(Clone, Debug, PartialEq)]
pub enum GroundVal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// An opaque object registered under a custom ground kind.
pub trait ExternalValue: fmt::Debug {
    /// The custom type tag this object carries, e.g. `"source"`.
    fn type_name(&self) -> &str;
}

/// A script closure: shared definition plus captured environment and
/// the labeled arguments supplied so far.
#[derive(Debug)]
pub struct FunValue {
    pub def: Rc<FunDef>,
    /// Snapshot of the free variables, taken once at creation.
    pub env: Vec<(String, Value)>,
    pub applied: Vec<(String, Value)>,
    /// For recursive functions, the name the body uses to call itself.
    pub self_name: Option<String>,
}

/// One formal parameter of a native builtin.
#[derive(Clone, Debug)]
pub struct FfiParam {
    pub label: String,
    /// Present iff the parameter is optional.
    pub default: Option<Value>,
}

impl FfiParam {
    pub fn required(label: impl Into<String>) -> Self {
        FfiParam { label: label.into(), default: None }
    }

    pub fn optional(label: impl Into<String>, default: Value) -> Self {
        FfiParam { label: label.into(), default: Some(default) }
    }
}

/// The native callback of a builtin. Receives the evaluator (so it can
/// call back into script code) and the arguments in formal order.
pub type FfiCall = dyn Fn(&mut Evaluator<'_>, Vec<(String, Value)>) -> RuntimeResult<Value>;

/// A native builtin, partially applicable like any function.
pub struct FfiValue {
    pub name: String,
    pub params: Vec<FfiParam>,
    pub applied: Vec<(String, Value)>,
    pub call: Rc<FfiCall>,
}

impl FfiValue {
    pub fn new(
        name: impl Into<String>,
        params: Vec<FfiParam>,
        call: impl Fn(&mut Evaluator<'_>, Vec<(String, Value)>) -> RuntimeResult<Value> + 'static,
    ) -> Self {
        FfiValue { name: name.into(), params, applied: Vec::new(), call: Rc::new(call) }
    }
}

impl fmt::Debug for FfiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfiValue")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Ground(GroundVal),
    Null,
    External(Rc<dyn ExternalValue>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Ref(Rc<RefCell<Value>>),
    /// One method stacked on a base value; lookup scans front to back,
    /// so a later definition shadows without erasing.
    Meth { label: String, value: Box<Value>, rest: Box<Value> },
    Fun(Rc<FunValue>),
    Ffi(Rc<FfiValue>),
}

impl Value {
    pub fn unit() -> Value {
        Value::Tuple(Vec::new())
    }

    pub fn bool_(b: bool) -> Value {
        Value::Ground(GroundVal::Bool(b))
    }

    pub fn int(i: i64) -> Value {
        Value::Ground(GroundVal::Int(i))
    }

    pub fn float(x: f64) -> Value {
        Value::Ground(GroundVal::Float(x))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::Ground(GroundVal::String(s.into()))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.demeth(), Value::Tuple(elems) if elems.is_empty())
    }

    /// The value under all method entries.
    pub fn demeth(&self) -> &Value {
        let mut v = self;
        while let Value::Meth { rest, .. } = v {
            v = rest;
        }
        v
    }

    /// First method matching `label`, scanning front to back.
    pub fn invoke_meth(&self, label: &str) -> Option<&Value> {
        let mut v = self;
        loop {
            match v {
                Value::Meth { label: l, value, rest } => {
                    if l == label {
                        return Some(value);
                    }
                    v = rest;
                }
                _ => return None,
            }
        }
    }

    /// Drop the first method matching `label`, keeping the rest of the
    /// chain intact. Clones only the prefix up to the hidden entry.
    pub fn hide_meth(&self, label: &str) -> Value {
        match self {
            Value::Meth { label: l, value, rest } => {
                if l == label {
                    (**rest).clone()
                } else {
                    Value::Meth {
                        label: l.clone(),
                        value: value.clone(),
                        rest: Box::new(rest.hide_meth(label)),
                    }
                }
            }
            other => other.clone(),
        }
    }

    /// All method entries in chain order, plus the base value.
    pub fn split_meths(&self) -> (Vec<(&str, &Value)>, &Value) {
        let mut entries = Vec::new();
        let mut v = self;
        loop {
            match v {
                Value::Meth { label, value, rest } => {
                    entries.push((label.as_str(), &**value));
                    v = rest;
                }
                _ => return (entries, v),
            }
        }
    }

    /// JSON export. The type, when known, decides whether a list of
    /// string-keyed pairs renders as an object (`as_object`) and which
    /// field names records export under (`json_name`).
    pub fn to_json(&self, arena: &TypeArena, ty: Option<TypeId>) -> Json {
        let dty = ty.map(|t| arena.deref(t));
        match self {
            Value::Ground(GroundVal::Bool(b)) => Json::Bool(*b),
            Value::Ground(GroundVal::Int(i)) => Json::from(*i),
            Value::Ground(GroundVal::Float(x)) => {
                serde_json::Number::from_f64(*x).map(Json::Number).unwrap_or(Json::Null)
            }
            Value::Ground(GroundVal::String(s)) => Json::String(s.clone()),
            Value::Null => Json::Null,
            Value::External(_) | Value::Fun(_) | Value::Ffi(_) => Json::Null,
            Value::Ref(r) => {
                let inner = match dty.map(|t| arena.descr(t)) {
                    Some(TyDescr::Constr { params, .. }) => params.first().map(|(_, t)| *t),
                    _ => None,
                };
                r.borrow().to_json(arena, inner)
            }
            Value::Tuple(vs) => {
                let elem_tys: Vec<Option<TypeId>> = match dty.map(|t| arena.descr(t)) {
                    Some(TyDescr::Tuple(ts)) if ts.len() == vs.len() => {
                        ts.iter().map(|t| Some(*t)).collect()
                    }
                    _ => vec![None; vs.len()],
                };
                Json::Array(
                    vs.iter().zip(elem_tys).map(|(v, t)| v.to_json(arena, t)).collect(),
                )
            }
            Value::List(vs) => {
                let (elem_ty, as_object) = match dty.map(|t| arena.descr(t)) {
                    Some(TyDescr::List { elem, as_object }) => (Some(*elem), *as_object),
                    _ => (None, false),
                };
                if as_object {
                    if let Some(pairs) = string_keyed_pairs(vs) {
                        let val_ty = elem_ty.and_then(|t| match arena.descr(arena.deref(t)) {
                            TyDescr::Tuple(ts) if ts.len() == 2 => Some(ts[1]),
                            _ => None,
                        });
                        let mut map = serde_json::Map::new();
                        for (k, v) in pairs {
                            map.insert(k.clone(), v.to_json(arena, val_ty));
                        }
                        return Json::Object(map);
                    }
                }
                Json::Array(vs.iter().map(|v| v.to_json(arena, elem_ty)).collect())
            }
            Value::Meth { .. } => {
                let (entries, base) = self.split_meths();
                if !base.is_unit() {
                    // Methods on a non-unit value are metadata; export
                    // the carrier.
                    return base.to_json(arena, dty.map(|t| arena.demeth(t)));
                }
                let mut map = serde_json::Map::new();
                // Walk back to front so front (shadowing) entries win.
                for (label, value) in entries.into_iter().rev() {
                    let (key, field_ty) = match dty
                        .and_then(|t| arena.invoke_meth(t, label))
                    {
                        Some(scheme) => {
                            let key = json_field_name(arena, dty, label)
                                .unwrap_or_else(|| label.to_string());
                            (key, Some(scheme.ty))
                        }
                        None => (label.to_string(), None),
                    };
                    map.insert(key, value.to_json(arena, field_ty));
                }
                Json::Object(map)
            }
        }
    }
}

fn string_keyed_pairs(vs: &[Value]) -> Option<Vec<(&String, &Value)>> {
    vs.iter()
        .map(|v| match v.demeth() {
            Value::Tuple(pair) if pair.len() == 2 => match &pair[0] {
                Value::Ground(GroundVal::String(k)) => Some((k, &pair[1])),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn json_field_name(arena: &TypeArena, ty: Option<TypeId>, label: &str) -> Option<String> {
    let mut t = arena.deref(ty?);
    loop {
        match arena.descr(t) {
            TyDescr::Meth { label: l, json_name, base, .. } => {
                if l == label {
                    return json_name.clone();
                }
                t = arena.deref(*base);
            }
            _ => return None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ground(GroundVal::Bool(b)) => write!(f, "{b}"),
            Value::Ground(GroundVal::Int(i)) => write!(f, "{i}"),
            Value::Ground(GroundVal::Float(x)) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Ground(GroundVal::String(s)) => write!(f, "{s:?}"),
            Value::Null => write!(f, "null"),
            Value::External(e) => write!(f, "<{}>", e.type_name()),
            Value::List(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Tuple(vs) => {
                if vs.is_empty() {
                    return write!(f, "()");
                }
                write!(f, "(")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
            Value::Ref(r) => write!(f, "ref({})", r.borrow()),
            Value::Meth { .. } => {
                let (entries, base) = self.split_meths();
                if !base.is_unit() {
                    write!(f, "{base}.")?;
                }
                write!(f, "{{")?;
                for (i, (label, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{label} = {value}")?;
                }
                write!(f, "}}")
            }
            Value::Fun(_) => write!(f, "<fun>"),
            Value::Ffi(ffi) => write!(f, "<fun:{}>", ffi.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, Value)]) -> Value {
        let mut v = Value::unit();
        for (label, value) in fields {
            v = Value::Meth {
                label: label.to_string(),
                value: Box::new(value.clone()),
                rest: Box::new(v),
            };
        }
        v
    }

    #[test]
    fn invoke_meth_prefers_front_entries() {
        let v = record(&[("a", Value::int(1)), ("a", Value::int(2))]);
        assert!(matches!(
            v.invoke_meth("a"),
            Some(Value::Ground(GroundVal::Int(2)))
        ));
        // The shadowed entry is still physically present.
        let (entries, _) = v.split_meths();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn hide_meth_unshadows() {
        let v = record(&[("a", Value::int(1)), ("a", Value::int(2))]);
        let hidden = v.hide_meth("a");
        assert!(matches!(
            hidden.invoke_meth("a"),
            Some(Value::Ground(GroundVal::Int(1)))
        ));
    }

    #[test]
    fn display_notation() {
        let v = record(&[("a", Value::int(1))]);
        assert_eq!(v.to_string(), "{a = 1}");
        let l = Value::List(vec![Value::float(1.0), Value::float(2.5)]);
        assert_eq!(l.to_string(), "[1.0, 2.5]");
        let carrier = Value::Meth {
            label: "len".into(),
            value: Box::new(Value::int(5)),
            rest: Box::new(Value::string("hello")),
        };
        assert_eq!(carrier.to_string(), "\"hello\".{len = 5}");
    }

    #[test]
    fn json_export_of_records_and_lists() {
        let arena = TypeArena::new();
        let v = record(&[("a", Value::int(1)), ("b", Value::bool_(true))]);
        let j = v.to_json(&arena, None);
        assert_eq!(j, serde_json::json!({"a": 1, "b": true}));

        let l = Value::List(vec![Value::int(1), Value::int(2)]);
        assert_eq!(l.to_json(&arena, None), serde_json::json!([1, 2]));
    }

    #[test]
    fn json_export_honors_as_object() {
        let mut arena = TypeArena::new();
        let s = arena.string();
        let i = arena.int();
        let pair = arena.tuple(vec![s, i]);
        let ty = arena.make(TyDescr::List { elem: pair, as_object: true });
        let v = Value::List(vec![
            Value::Tuple(vec![Value::string("x"), Value::int(1)]),
            Value::Tuple(vec![Value::string("y"), Value::int(2)]),
        ]);
        assert_eq!(
            v.to_json(&arena, Some(ty)),
            serde_json::json!({"x": 1, "y": 2})
        );
    }

    #[test]
    fn json_shadowed_field_exports_front_entry() {
        let arena = TypeArena::new();
        let v = record(&[("a", Value::int(1)), ("a", Value::int(2))]);
        assert_eq!(v.to_json(&arena, None), serde_json::json!({"a": 2}));
    }
}
