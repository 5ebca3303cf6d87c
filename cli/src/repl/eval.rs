use jexpr::{Environment, StdioAdapter};
use std::rc::Rc;

use crate::read_programs;

#[derive(Debug)]
pub enum EvalError {
  Incomplete,
  Error(String),
}

impl From<jexpr::EvalError> for EvalError {
  fn from(err: jexpr::EvalError) -> Self {
    EvalError::Error(err.to_string())
  }
}

/// Evaluate every JSON document in `input`, one after another, in `env`.
///
/// Nothing is evaluated until the whole input parses. Input that ends in the
/// middle of a document is reported as `Incomplete` so the caller can keep
/// reading lines.
pub fn process_input(
  input: &str,
  interactive_mode: bool,
  env: &Rc<Environment>,
) -> Result<String, EvalError> {
  let programs = match read_programs(input) {
    Ok(programs) => programs,
    Err(e) if e.is_eof() => return Err(EvalError::Incomplete),
    Err(e) => return Err(EvalError::Error(format!("Invalid JSON: {}", e))),
  };

  if programs.is_empty() {
    return Err(EvalError::Error("Empty input".to_string()));
  }

  let mut io = StdioAdapter::new();
  let mut results = Vec::with_capacity(programs.len());
  for program in &programs {
    let evaluated = jexpr::run(program, env, &mut io)?;
    results.push(format!("{}", evaluated));
  }

  if interactive_mode {
    Ok(results.join("\n"))
  } else {
    results
      .pop()
      .ok_or_else(|| EvalError::Error("No result".to_string()))
  }
}
