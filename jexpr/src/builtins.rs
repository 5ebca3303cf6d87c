//! Primitive procedures installed in the root environment.

use std::cmp::Ordering;
use std::rc::Rc;

use ecow::eco_format;

use crate::env::Environment;
use crate::eval::EvalError;
use crate::io::IoAdapter;
use crate::value::{Number, Primitive, Value};

type Builtin = fn(&mut dyn IoAdapter, &[Value]) -> Result<Value, EvalError>;

const BUILTINS: &[(&str, usize, Builtin)] = &[
  ("+", 2, add),
  ("-", 2, subtract),
  ("*", 2, multiply),
  ("/", 2, divide),
  ("%", 2, remainder),
  ("=", 2, equals),
  (">", 2, greater_than),
  (">=", 2, greater_or_equal),
  ("<", 2, less_than),
  ("<=", 2, less_or_equal),
  ("display", 1, display),
];

/// Define every builtin primitive in `env`.
pub fn install(env: &Environment) -> Result<(), EvalError> {
  for &(name, arity, func) in BUILTINS {
    env.define(name, Value::Primitive(Rc::new(Primitive::new(name, arity, func))))?;
  }
  Ok(())
}

impl Environment {
  /// A fresh root environment holding the builtin primitives.
  pub fn with_builtins() -> Result<Rc<Environment>, EvalError> {
    let env = Environment::new();
    install(&env)?;
    Ok(env)
  }
}

fn binary<'a>(name: &str, args: &'a [Value]) -> Result<(&'a Value, &'a Value), EvalError> {
  match args {
    [left, right] => Ok((left, right)),
    _ => Err(EvalError::ArityMismatch {
      procedure: name.to_string(),
      expected: 2,
      got: args.len(),
    }),
  }
}

fn number(name: &str, value: &Value) -> Result<Number, EvalError> {
  match value {
    Value::Number(number) => Ok(*number),
    other => Err(EvalError::TypeError(format!(
      "{name} expects numbers, got {}",
      other.type_name()
    ))),
  }
}

/// Integer arithmetic falls back to doubles when `checked` overflows.
fn arithmetic(
  name: &str,
  args: &[Value],
  checked: fn(i64, i64) -> Option<i64>,
  float: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
  let (left, right) = binary(name, args)?;
  let result = match (number(name, left)?, number(name, right)?) {
    (Number::Integer(left), Number::Integer(right)) => checked(left, right)
      .map_or_else(|| Number::Double(float(left as f64, right as f64)), Number::Integer),
    (left, right) => Number::Double(float(left.as_f64(), right.as_f64())),
  };
  Ok(Value::Number(result))
}

fn add(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  if let (Value::String(left), Value::String(right)) = binary("+", args)? {
    return Ok(Value::String(eco_format!("{left}{right}")));
  }
  arithmetic("+", args, i64::checked_add, |a, b| a + b)
}

fn subtract(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  arithmetic("-", args, i64::checked_sub, |a, b| a - b)
}

fn multiply(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  arithmetic("*", args, i64::checked_mul, |a, b| a * b)
}

fn divide(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  let (left, right) = binary("/", args)?;
  let result = match (number("/", left)?, number("/", right)?) {
    (Number::Integer(_), Number::Integer(0)) => return Err(EvalError::DivisionByZero),
    (Number::Integer(left), Number::Integer(right)) if left.checked_rem(right) == Some(0) => left
      .checked_div(right)
      .map_or_else(|| Number::Double(left as f64 / right as f64), Number::Integer),
    (left, right) => Number::Double(left.as_f64() / right.as_f64()),
  };
  Ok(Value::Number(result))
}

fn remainder(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  let (left, right) = binary("%", args)?;
  let result = match (number("%", left)?, number("%", right)?) {
    (Number::Integer(_), Number::Integer(0)) => return Err(EvalError::DivisionByZero),
    (Number::Integer(left), Number::Integer(right)) => {
      Number::Integer(left.checked_rem(right).unwrap_or(0))
    }
    (left, right) => Number::Double(left.as_f64() % right.as_f64()),
  };
  Ok(Value::Number(result))
}

fn equals(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  let (left, right) = binary("=", args)?;
  Ok(Value::Bool(left == right))
}

fn compare(name: &str, args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value, EvalError> {
  let (left, right) = binary(name, args)?;
  let ordering = match (left, right) {
    (Value::Number(left), Value::Number(right)) => left.partial_cmp(right),
    (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
    _ => {
      return Err(EvalError::TypeError(format!(
        "{name} cannot compare {} with {}",
        left.type_name(),
        right.type_name()
      )));
    }
  };
  Ok(Value::Bool(ordering.is_some_and(accept)))
}

fn greater_than(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  compare(">", args, Ordering::is_gt)
}

fn greater_or_equal(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  compare(">=", args, Ordering::is_ge)
}

fn less_than(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  compare("<", args, Ordering::is_lt)
}

fn less_or_equal(_io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  compare("<=", args, Ordering::is_le)
}

fn display(io: &mut dyn IoAdapter, args: &[Value]) -> Result<Value, EvalError> {
  let text = match args {
    [Value::String(text)] => text.to_string(),
    [value] => value.to_string(),
    _ => {
      return Err(EvalError::ArityMismatch {
        procedure: "display".to_string(),
        expected: 1,
        got: args.len(),
      });
    }
  };
  io.println(&text)
    .map_err(|err| EvalError::Io(err.to_string()))?;
  Ok(Value::Null)
}
