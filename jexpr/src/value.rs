use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ecow::EcoString;

use crate::env::Environment;
use crate::eval::EvalError;
use crate::expr::Expression;
use crate::io::IoAdapter;

#[derive(Debug, Clone, Copy)]
pub enum Number {
  Integer(i64),
  Double(f64),
}

impl Number {
  pub fn as_f64(self) -> f64 {
    match self {
      Number::Integer(value) => value as f64,
      Number::Double(value) => value,
    }
  }
}

impl PartialEq for Number {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Number::Integer(left), Number::Integer(right)) => left == right,
      _ => self.as_f64() == other.as_f64(),
    }
  }
}

impl PartialOrd for Number {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    match (self, other) {
      (Number::Integer(left), Number::Integer(right)) => Some(left.cmp(right)),
      _ => self.as_f64().partial_cmp(&other.as_f64()),
    }
  }
}

impl fmt::Display for Number {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Number::Integer(value) => write!(f, "{}", value),
      Number::Double(value) => write!(f, "{}", value),
    }
  }
}

/// Host function backing a primitive procedure.
///
/// Primitives receive the evaluator's output adapter so that procedures such
/// as `display` can write without reaching for global state.
pub type PrimitiveFn = dyn Fn(&mut dyn IoAdapter, &[Value]) -> Result<Value, EvalError>;

pub struct Primitive {
  pub name: EcoString,
  pub arity: usize,
  pub func: Box<PrimitiveFn>,
}

impl Primitive {
  pub fn new(
    name: impl Into<EcoString>,
    arity: usize,
    func: impl Fn(&mut dyn IoAdapter, &[Value]) -> Result<Value, EvalError> + 'static,
  ) -> Self {
    Self {
      name: name.into(),
      arity,
      func: Box::new(func),
    }
  }
}

impl fmt::Debug for Primitive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<primitive {}/{}>", self.name, self.arity)
  }
}

/// A procedure created by `lambda`.
///
/// `env` is the frame the lambda was evaluated in, not the caller's frame.
/// Applying the closure always extends `env`, which is what makes scoping
/// lexical.
pub struct Closure {
  pub env: Rc<Environment>,
  pub formals: Rc<[EcoString]>,
  pub body: Rc<Expression>,
}

// The captured frame usually holds the closure itself, so it is left out.
impl fmt::Debug for Closure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Closure")
      .field("formals", &self.formals)
      .field("body", &self.body)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Clone)]
pub enum Value {
  Number(Number),
  String(EcoString),
  Bool(bool),
  Null,

  List(Rc<[Value]>),
  Record(Rc<BTreeMap<EcoString, Value>>),

  Primitive(Rc<Primitive>),
  Closure(Rc<Closure>),
}

impl Value {
  pub fn list(items: Vec<Value>) -> Value {
    Value::List(items.into())
  }

  /// Only `false` and `null` are falsy.
  pub fn is_truthy(&self) -> bool {
    !matches!(self, Value::Bool(false) | Value::Null)
  }

  pub fn is_procedure(&self) -> bool {
    matches!(self, Value::Primitive(_) | Value::Closure(_))
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Number(Number::Integer(_)) => "integer",
      Value::Number(Number::Double(_)) => "double",
      Value::String(_) => "string",
      Value::Bool(_) => "bool",
      Value::Null => "null",
      Value::List(_) => "list",
      Value::Record(_) => "record",
      Value::Primitive(_) => "primitive",
      Value::Closure(_) => "closure",
    }
  }

  /// Build a datum from a JSON document.
  ///
  /// Integral numbers that fit in an `i64` become integers, everything else
  /// becomes a double.
  pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(value) => Value::Bool(*value),
      serde_json::Value::Number(number) => match number.as_i64() {
        Some(value) => Value::Number(Number::Integer(value)),
        None => Value::Number(Number::Double(number.as_f64().unwrap_or(f64::NAN))),
      },
      serde_json::Value::String(value) => Value::String(value.as_str().into()),
      serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
      serde_json::Value::Object(fields) => Value::Record(Rc::new(
        fields
          .iter()
          .map(|(key, value)| (EcoString::from(key.as_str()), Value::from_json(value)))
          .collect(),
      )),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Number(left), Value::Number(right)) => left == right,
      (Value::String(left), Value::String(right)) => left == right,
      (Value::Bool(left), Value::Bool(right)) => left == right,
      (Value::Null, Value::Null) => true,
      (Value::List(left), Value::List(right)) => left == right,
      (Value::Record(left), Value::Record(right)) => left == right,
      (Value::Primitive(left), Value::Primitive(right)) => Rc::ptr_eq(left, right),
      (Value::Closure(left), Value::Closure(right)) => Rc::ptr_eq(left, right),
      _ => false,
    }
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Number(Number::Integer(value))
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Number(Number::Double(value))
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.into())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value.into())
  }
}

impl From<EcoString> for Value {
  fn from(value: EcoString) -> Self {
    Value::String(value)
  }
}

impl From<Vec<Value>> for Value {
  fn from(items: Vec<Value>) -> Self {
    Value::list(items)
  }
}

fn write_string(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
  let quoted = serde_json::to_string(value).map_err(|_| fmt::Error)?;
  f.write_str(&quoted)
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Number(number) => write!(f, "{}", number),
      Value::String(value) => write_string(f, value),
      Value::Bool(value) => write!(f, "{}", value),
      Value::Null => write!(f, "null"),
      Value::List(items) => {
        write!(f, "[")?;
        for (index, item) in items.iter().enumerate() {
          if index > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", item)?;
        }
        write!(f, "]")
      }
      Value::Record(fields) => {
        write!(f, "{{")?;
        for (index, (key, value)) in fields.iter().enumerate() {
          if index > 0 {
            write!(f, ", ")?;
          }
          write_string(f, key)?;
          write!(f, ": {}", value)?;
        }
        write!(f, "}}")
      }
      Value::Primitive(primitive) => write!(f, "<primitive {}>", primitive.name),
      Value::Closure(closure) => write!(f, "<closure ({})>", closure.formals.join(" ")),
    }
  }
}
