pub mod builtins;
pub mod env;
pub mod eval;
pub mod expr;
pub mod io;
pub mod value;

use std::rc::Rc;

pub use env::{Binding, Environment};
pub use eval::{EvalError, Evaluator};
pub use expr::{Expression, SpecialForm};
pub use io::{IoAdapter, StdioAdapter, StringIoAdapter};
pub use value::{Closure, Number, Primitive, Value};

/// Decode a JSON program and evaluate it in `env`.
pub fn run(
  program: &serde_json::Value,
  env: &Rc<Environment>,
  io: &mut dyn IoAdapter,
) -> Result<Value, EvalError> {
  let expr = Expression::from_json(program)?;
  Evaluator::with_environment(io, Rc::clone(env)).eval(&expr)
}
