use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use ecow::EcoString;

use crate::eval::EvalError;
use crate::value::Value;

/// Strings starting with this character are references to a binding.
pub const REFERENCE_SIGIL: char = '$';

/// Record field names of the program encoding.
pub mod field {
  pub const OPERATOR: &str = "operator";
  pub const ARGUMENTS: &str = "arguments";
  pub const NAME: &str = "name";
  pub const VALUE: &str = "value";
  pub const PREDICATE: &str = "predicate";
  pub const THEN: &str = "then";
  pub const ELSE: &str = "else";
  pub const BODY: &str = "body";
  pub const CODE: &str = "code";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
  Define,
  Set,
  If,
  Quote,
  Lambda,
  Eval,
}

impl SpecialForm {
  pub fn keyword(self) -> &'static str {
    match self {
      SpecialForm::Define => "define",
      SpecialForm::Set => "set!",
      SpecialForm::If => "if",
      SpecialForm::Quote => "quote",
      SpecialForm::Lambda => "lambda",
      SpecialForm::Eval => "eval",
    }
  }

  pub fn from_keyword(keyword: &str) -> Option<Self> {
    match keyword {
      "define" => Some(SpecialForm::Define),
      "set!" => Some(SpecialForm::Set),
      "if" => Some(SpecialForm::If),
      "quote" => Some(SpecialForm::Quote),
      "lambda" => Some(SpecialForm::Lambda),
      "eval" => Some(SpecialForm::Eval),
      _ => None,
    }
  }
}

impl fmt::Display for SpecialForm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.keyword())
  }
}

/// A decoded program node.
///
/// Every record with an `operator` field becomes either one of the special
/// form variants or an [`Expression::Application`]. Anything that is neither
/// a reference, a sequence nor an operator record evaluates to itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
  Literal(Value),
  Reference(EcoString),
  Sequence(Vec<Expression>),
  Application {
    operator: EcoString,
    arguments: Vec<Expression>,
  },

  Define {
    name: EcoString,
    value: Box<Expression>,
  },
  Set {
    name: EcoString,
    value: Box<Expression>,
  },
  If {
    predicate: Box<Expression>,
    then: Option<Box<Expression>>,
    otherwise: Option<Box<Expression>>,
  },
  Quote(Value),
  Lambda {
    formals: Rc<[EcoString]>,
    body: Rc<Expression>,
  },
  Eval {
    code: Box<Expression>,
  },
}

type Fields = BTreeMap<EcoString, Value>;

impl Expression {
  pub fn from_json(json: &serde_json::Value) -> Result<Expression, EvalError> {
    Expression::decode(&Value::from_json(json))
  }

  /// Decode a datum into an expression.
  ///
  /// This is also how `eval` turns quoted data back into code.
  pub fn decode(datum: &Value) -> Result<Expression, EvalError> {
    match datum {
      Value::String(text) => match text.strip_prefix(REFERENCE_SIGIL) {
        Some(name) => Ok(Expression::Reference(name.into())),
        None => Ok(Expression::Literal(datum.clone())),
      },
      Value::List(items) => Ok(Expression::Sequence(decode_all(items)?)),
      Value::Record(fields) => match fields.get(field::OPERATOR) {
        Some(operator) => decode_operator_record(operator, fields),
        None => Ok(Expression::Literal(datum.clone())),
      },
      _ => Ok(Expression::Literal(datum.clone())),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Expression::Literal(_) => "literal",
      Expression::Reference(_) => "reference",
      Expression::Sequence(_) => "sequence",
      Expression::Application { .. } => "application",
      Expression::Define { .. } => "define",
      Expression::Set { .. } => "set!",
      Expression::If { .. } => "if",
      Expression::Quote(_) => "quote",
      Expression::Lambda { .. } => "lambda",
      Expression::Eval { .. } => "eval",
    }
  }
}

fn decode_all(items: &[Value]) -> Result<Vec<Expression>, EvalError> {
  items.iter().map(Expression::decode).collect()
}

fn malformed(message: String) -> EvalError {
  EvalError::MalformedExpression(message)
}

fn required<'a>(fields: &'a Fields, form: &str, name: &str) -> Result<&'a Value, EvalError> {
  fields
    .get(name)
    .ok_or_else(|| malformed(format!("{form}: missing `{name}` field")))
}

fn required_expression(fields: &Fields, form: &str, name: &str) -> Result<Box<Expression>, EvalError> {
  Ok(Box::new(Expression::decode(required(fields, form, name)?)?))
}

fn optional_expression(fields: &Fields, name: &str) -> Result<Option<Box<Expression>>, EvalError> {
  fields
    .get(name)
    .map(|datum| Expression::decode(datum).map(Box::new))
    .transpose()
}

fn symbol_name(fields: &Fields, form: &str) -> Result<EcoString, EvalError> {
  match required(fields, form, field::NAME)? {
    Value::String(name) => Ok(name.clone()),
    other => Err(malformed(format!(
      "{form}: `name` must be a string, got {}",
      other.type_name()
    ))),
  }
}

fn formals(fields: &Fields) -> Result<Rc<[EcoString]>, EvalError> {
  let form = SpecialForm::Lambda.keyword();
  let Value::List(items) = required(fields, form, field::ARGUMENTS)? else {
    return Err(malformed(format!("{form}: `arguments` must be a list of names")));
  };

  let mut seen = HashSet::new();
  let mut names = Vec::with_capacity(items.len());
  for item in items.iter() {
    let Value::String(name) = item else {
      return Err(malformed(format!(
        "{form}: formal parameter must be a string, got {}",
        item.type_name()
      )));
    };
    if !seen.insert(name.clone()) {
      return Err(malformed(format!("{form}: duplicate formal parameter \"{name}\"")));
    }
    names.push(name.clone());
  }

  Ok(names.into())
}

fn decode_operator_record(operator: &Value, fields: &Fields) -> Result<Expression, EvalError> {
  let Value::String(operator) = operator else {
    return Err(malformed(format!(
      "`operator` must be a string, got {}",
      operator.type_name()
    )));
  };

  let Some(form) = SpecialForm::from_keyword(operator) else {
    let arguments = match fields.get(field::ARGUMENTS) {
      None => Vec::new(),
      Some(Value::List(items)) => decode_all(items)?,
      Some(other) => {
        return Err(malformed(format!(
          "{operator}: `arguments` must be a list, got {}",
          other.type_name()
        )));
      }
    };
    return Ok(Expression::Application {
      operator: operator.clone(),
      arguments,
    });
  };

  let keyword = form.keyword();
  match form {
    SpecialForm::Define => Ok(Expression::Define {
      name: symbol_name(fields, keyword)?,
      value: required_expression(fields, keyword, field::VALUE)?,
    }),
    SpecialForm::Set => Ok(Expression::Set {
      name: symbol_name(fields, keyword)?,
      value: required_expression(fields, keyword, field::VALUE)?,
    }),
    SpecialForm::If => Ok(Expression::If {
      predicate: required_expression(fields, keyword, field::PREDICATE)?,
      then: optional_expression(fields, field::THEN)?,
      otherwise: optional_expression(fields, field::ELSE)?,
    }),
    SpecialForm::Quote => Ok(Expression::Quote(
      required(fields, keyword, field::VALUE)?.clone(),
    )),
    SpecialForm::Lambda => Ok(Expression::Lambda {
      formals: formals(fields)?,
      body: Rc::new(Expression::decode(required(fields, keyword, field::BODY)?)?),
    }),
    SpecialForm::Eval => Ok(Expression::Eval {
      code: required_expression(fields, keyword, field::CODE)?,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn decode(json: serde_json::Value) -> Result<Expression, EvalError> {
    Expression::from_json(&json)
  }

  #[test]
  fn test_decode_literals_and_references() {
    assert_eq!(
      decode(json!(42)).unwrap(),
      Expression::Literal(Value::from(42))
    );
    assert_eq!(
      decode(json!("hello")).unwrap(),
      Expression::Literal(Value::from("hello"))
    );
    assert_eq!(
      decode(json!("$x")).unwrap(),
      Expression::Reference("x".into())
    );
    assert_eq!(
      decode(json!(null)).unwrap(),
      Expression::Literal(Value::Null)
    );
  }

  #[test]
  fn test_decode_application() {
    let expr = decode(json!({"operator": "+", "arguments": [1, "$y"]})).unwrap();
    assert_eq!(
      expr,
      Expression::Application {
        operator: "+".into(),
        arguments: vec![
          Expression::Literal(Value::from(1)),
          Expression::Reference("y".into())
        ],
      }
    );
  }

  #[test]
  fn test_decode_application_without_arguments() {
    let expr = decode(json!({"operator": "tick"})).unwrap();
    assert_eq!(
      expr,
      Expression::Application {
        operator: "tick".into(),
        arguments: vec![],
      }
    );
  }

  #[test]
  fn test_decode_special_forms() {
    assert!(matches!(
      decode(json!({"operator": "define", "name": "x", "value": 1})).unwrap(),
      Expression::Define { .. }
    ));
    assert!(matches!(
      decode(json!({"operator": "set!", "name": "x", "value": 1})).unwrap(),
      Expression::Set { .. }
    ));
    assert!(matches!(
      decode(json!({"operator": "eval", "code": "$x"})).unwrap(),
      Expression::Eval { .. }
    ));

    let Expression::Lambda { formals, .. } =
      decode(json!({"operator": "lambda", "arguments": ["a", "b"], "body": "$a"})).unwrap()
    else {
      panic!("expected lambda");
    };
    assert_eq!(&*formals, &[EcoString::from("a"), EcoString::from("b")]);
  }

  #[test]
  fn test_decode_quote_keeps_payload_as_data() {
    let expr = decode(json!({"operator": "quote", "value": {"operator": "+", "arguments": ["$x", 1]}}))
      .unwrap();

    let Expression::Quote(Value::Record(fields)) = expr else {
      panic!("expected quoted record");
    };
    assert_eq!(fields.get("operator"), Some(&Value::from("+")));
  }

  #[test]
  fn test_decode_if_branches_are_optional() {
    let expr = decode(json!({"operator": "if", "predicate": true, "then": 1})).unwrap();
    let Expression::If { then, otherwise, .. } = expr else {
      panic!("expected if");
    };
    assert!(then.is_some());
    assert!(otherwise.is_none());
  }

  #[test]
  fn test_record_without_operator_is_literal() {
    let expr = decode(json!({"name": "x"})).unwrap();
    assert!(matches!(expr, Expression::Literal(Value::Record(_))));
  }

  #[test]
  fn test_set_without_bang_is_an_application() {
    let expr = decode(json!({"operator": "set", "name": "x", "value": 1})).unwrap();
    assert!(matches!(expr, Expression::Application { .. }));
  }

  #[test]
  fn test_malformed_records() {
    assert!(matches!(
      decode(json!({"operator": "define", "value": 1})),
      Err(EvalError::MalformedExpression(_))
    ));
    assert!(matches!(
      decode(json!({"operator": 7})),
      Err(EvalError::MalformedExpression(_))
    ));
    assert!(matches!(
      decode(json!({"operator": "lambda", "arguments": ["x", 1], "body": 0})),
      Err(EvalError::MalformedExpression(_))
    ));
    assert!(matches!(
      decode(json!({"operator": "lambda", "arguments": ["x", "x"], "body": 0})),
      Err(EvalError::MalformedExpression(_))
    ));
    assert!(matches!(
      decode(json!({"operator": "+", "arguments": 3})),
      Err(EvalError::MalformedExpression(_))
    ));
    assert!(matches!(
      decode(json!([1, {"operator": "quote"}])),
      Err(EvalError::MalformedExpression(_))
    ));
  }
}
