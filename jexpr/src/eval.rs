use std::rc::Rc;

use ecow::EcoString;
use thiserror::Error;
use tracing::{debug, trace};

use crate::env::Environment;
use crate::expr::{Expression, SpecialForm, field};
use crate::io::IoAdapter;
use crate::value::{Closure, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
  #[error("Symbol \"{0}\" not defined!")]
  UnboundSymbol(EcoString),

  #[error("Symbol \"{0}\" used before its definition completed")]
  UnassignedSymbol(EcoString),

  #[error("Symbol \"{0}\" already defined in this environment!")]
  DuplicateDefinition(EcoString),

  #[error("Malformed expression: {0}")]
  MalformedExpression(String),

  #[error("Wrong number of arguments for {procedure}: expected {expected}, got {got}")]
  ArityMismatch {
    procedure: String,
    expected: usize,
    got: usize,
  },

  #[error("Not a procedure: {0}")]
  NotCallable(String),

  #[error("Type error: {0}")]
  TypeError(String),

  #[error("Division by zero")]
  DivisionByZero,

  #[error("I/O error: {0}")]
  Io(String),
}

/// Evaluates expressions against a root environment.
///
/// The evaluator owns no bindings itself. It keeps the root frame for
/// top-level evaluation and the output adapter handed to primitives.
pub struct Evaluator<'io> {
  io: &'io mut dyn IoAdapter,
  env: Rc<Environment>,
}

impl<'io> Evaluator<'io> {
  pub fn with_environment(io: &'io mut dyn IoAdapter, env: Rc<Environment>) -> Self {
    Self { io, env }
  }

  /// Evaluate `expr` in the root environment.
  pub fn eval(&mut self, expr: &Expression) -> Result<Value, EvalError> {
    let env = Rc::clone(&self.env);
    self.eval_in(expr, &env)
  }

  pub fn eval_in(&mut self, expr: &Expression, env: &Rc<Environment>) -> Result<Value, EvalError> {
    trace!(kind = expr.kind(), "eval");

    match expr {
      Expression::Literal(value) => Ok(value.clone()),

      Expression::Reference(name) => env.lookup(name),

      Expression::Sequence(items) => {
        let mut last = Value::Null;
        for item in items {
          last = self.eval_in(item, env)?;
        }
        Ok(last)
      }

      Expression::Application {
        operator,
        arguments,
      } => {
        let procedure = env.lookup(operator)?;
        let arguments = arguments
          .iter()
          .map(|argument| self.eval_in(argument, env))
          .collect::<Result<Vec<_>, _>>()?;
        self.apply(&procedure, arguments)
      }

      // Declare first so a lambda on the right-hand side can refer to itself.
      Expression::Define { name, value } => {
        env.declare(name.clone())?;
        let value = match self.eval_in(value, env) {
          Ok(value) => value,
          Err(err) => {
            env.undeclare(name);
            return Err(err);
          }
        };
        env.mutate(name, value)?;
        Ok(Value::Null)
      }

      Expression::Set { name, value } => {
        let value = self.eval_in(value, env)?;
        env.mutate(name, value)?;
        Ok(Value::Null)
      }

      Expression::If {
        predicate,
        then,
        otherwise,
      } => {
        let (branch, branch_field) = if self.eval_in(predicate, env)?.is_truthy() {
          (then, field::THEN)
        } else {
          (otherwise, field::ELSE)
        };

        match branch {
          Some(branch) => self.eval_in(branch, env),
          None => Err(EvalError::MalformedExpression(format!(
            "{}: missing `{branch_field}` branch",
            SpecialForm::If
          ))),
        }
      }

      Expression::Quote(datum) => Ok(datum.clone()),

      Expression::Lambda { formals, body } => Ok(Value::Closure(Rc::new(Closure {
        env: Rc::clone(env),
        formals: Rc::clone(formals),
        body: Rc::clone(body),
      }))),

      Expression::Eval { code } => {
        let datum = self.eval_in(code, env)?;
        let expr = Expression::decode(&datum)?;
        self.eval_in(&expr, env)
      }
    }
  }

  /// Call a primitive or closure with already evaluated arguments.
  pub fn apply(&mut self, procedure: &Value, arguments: Vec<Value>) -> Result<Value, EvalError> {
    match procedure {
      Value::Primitive(primitive) => {
        check_arity(&primitive.name, primitive.arity, arguments.len())?;
        debug!(name = %primitive.name, "calling primitive");
        (primitive.func)(&mut *self.io, &arguments)
      }

      Value::Closure(closure) => {
        check_arity(procedure, closure.formals.len(), arguments.len())?;
        debug!(formals = ?closure.formals, "applying closure");
        let frame = closure
          .env
          .extend(closure.formals.iter().cloned().zip(arguments))?;
        self.eval_in(&closure.body, &frame)
      }

      other => Err(EvalError::NotCallable(other.to_string())),
    }
  }
}

fn check_arity(
  procedure: &dyn std::fmt::Display,
  expected: usize,
  got: usize,
) -> Result<(), EvalError> {
  if expected != got {
    return Err(EvalError::ArityMismatch {
      procedure: procedure.to_string(),
      expected,
      got,
    });
  }
  Ok(())
}
