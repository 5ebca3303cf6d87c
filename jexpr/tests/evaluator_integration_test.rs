use std::rc::Rc;

use jexpr::*;
use serde_json::json;

struct Outcome {
  result: Result<Value, EvalError>,
  output: String,
  env: Rc<Environment>,
}

fn run_program(program: serde_json::Value) -> Outcome {
  let env = Environment::with_builtins().expect("builtins install");
  let mut io = StringIoAdapter::new();
  let result = run(&program, &env, &mut io);
  Outcome {
    result,
    output: io.take_output(),
    env,
  }
}

#[test]
fn test_sequence_semantics() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "x", "value": 2},
    {"operator": "define", "name": "y", "value": 3},
    {"operator": "set!", "name": "x", "value": 3},
    {"operator": "=", "arguments": ["$x", "$y"]}
  ]));

  assert_eq!(outcome.result.unwrap(), Value::Bool(true));
  assert_eq!(outcome.env.lookup("x").unwrap(), Value::from(3));
  assert_eq!(outcome.env.lookup("y").unwrap(), Value::from(3));
}

#[test]
fn test_square_closure() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "square", "value": {
      "operator": "lambda",
      "arguments": ["x"],
      "body": {"operator": "*", "arguments": ["$x", "$x"]}
    }},
    {"operator": "square", "arguments": [4]}
  ]));

  assert_eq!(outcome.result.unwrap(), Value::from(16));
}

#[test]
fn test_recursive_definition() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "factorial", "value": {
      "operator": "lambda",
      "arguments": ["n"],
      "body": {
        "operator": "if",
        "predicate": {"operator": "<=", "arguments": ["$n", 1]},
        "then": 1,
        "else": {"operator": "*", "arguments": [
          "$n",
          {"operator": "factorial", "arguments": [{"operator": "-", "arguments": ["$n", 1]}]}
        ]}
      }
    }},
    {"operator": "factorial", "arguments": [10]}
  ]));

  assert_eq!(outcome.result.unwrap(), Value::from(3628800));
}

#[test]
fn test_if_never_evaluates_other_branch() {
  let then_taken = run_program(json!({
    "operator": "if", "predicate": true, "then": 1, "else": "$undefinedName"
  }));
  assert_eq!(then_taken.result.unwrap(), Value::from(1));

  let else_taken = run_program(json!({
    "operator": "if", "predicate": false, "then": "$undefinedName", "else": 2
  }));
  assert_eq!(else_taken.result.unwrap(), Value::from(2));
}

#[test]
fn test_unbound_reference() {
  let outcome = run_program(json!("$undefinedName"));
  assert_eq!(
    outcome.result,
    Err(EvalError::UnboundSymbol("undefinedName".into()))
  );
}

#[test]
fn test_redefinition_in_same_frame() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "a", "value": 1},
    {"operator": "define", "name": "a", "value": 2}
  ]));

  assert_eq!(
    outcome.result,
    Err(EvalError::DuplicateDefinition("a".into()))
  );
  assert_eq!(outcome.env.lookup("a").unwrap(), Value::from(1));
}

#[test]
fn test_redefining_a_formal_parameter() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "f", "value": {
      "operator": "lambda",
      "arguments": ["x"],
      "body": {"operator": "define", "name": "x", "value": 0}
    }},
    {"operator": "f", "arguments": [1]}
  ]));

  assert_eq!(
    outcome.result,
    Err(EvalError::DuplicateDefinition("x".into()))
  );
}

#[test]
fn test_shadowing_leaves_parent_untouched() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "x", "value": 1},
    {"operator": "define", "name": "shadow", "value": {
      "operator": "lambda",
      "arguments": ["y"],
      "body": [
        {"operator": "define", "name": "x", "value": "$y"},
        "$x"
      ]
    }},
    {"operator": "display", "arguments": [{"operator": "shadow", "arguments": [42]}]},
    "$x"
  ]));

  assert_eq!(outcome.result.unwrap(), Value::from(1));
  assert_eq!(outcome.output, "42\n");
}

#[test]
fn test_closure_sees_mutation_of_captured_frame() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "x", "value": 1},
    {"operator": "define", "name": "get", "value": {
      "operator": "lambda", "arguments": [], "body": "$x"
    }},
    {"operator": "set!", "name": "x", "value": 5},
    {"operator": "get", "arguments": []}
  ]));

  assert_eq!(outcome.result.unwrap(), Value::from(5));
}

#[test]
fn test_scoping_is_lexical_not_dynamic() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "x", "value": "global"},
    {"operator": "define", "name": "get", "value": {
      "operator": "lambda", "arguments": [], "body": "$x"
    }},
    {"operator": "define", "name": "caller", "value": {
      "operator": "lambda",
      "arguments": ["x"],
      "body": {"operator": "get", "arguments": []}
    }},
    {"operator": "caller", "arguments": ["local"]}
  ]));

  assert_eq!(outcome.result.unwrap(), Value::from("global"));
}

#[test]
fn test_closures_share_their_defining_frame() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "make-account", "value": {
      "operator": "lambda",
      "arguments": ["balance"],
      "body": [
        {"operator": "define", "name": "deposit", "value": {
          "operator": "lambda",
          "arguments": ["amount"],
          "body": [
            {"operator": "set!", "name": "balance", "value": {"operator": "+", "arguments": ["$balance", "$amount"]}},
            "$balance"
          ]
        }},
        {"operator": "define", "name": "peek", "value": {
          "operator": "lambda", "arguments": [], "body": "$balance"
        }},
        {"operator": "lambda", "arguments": ["message", "amount"], "body": {
          "operator": "if",
          "predicate": {"operator": "=", "arguments": ["$message", "deposit"]},
          "then": {"operator": "deposit", "arguments": ["$amount"]},
          "else": {"operator": "peek", "arguments": []}
        }}
      ]
    }},
    {"operator": "define", "name": "first", "value": {"operator": "make-account", "arguments": [100]}},
    {"operator": "define", "name": "second", "value": {"operator": "make-account", "arguments": [7]}},
    {"operator": "first", "arguments": ["deposit", 20]},
    {"operator": "first", "arguments": ["deposit", 5]},
    {"operator": "display", "arguments": [{"operator": "second", "arguments": ["peek", 0]}]},
    {"operator": "first", "arguments": ["peek", 0]}
  ]));

  assert_eq!(outcome.result.unwrap(), Value::from(125));
  assert_eq!(outcome.output, "7\n");
  assert!(!outcome.env.is_defined_locally("balance"));
}

#[test]
fn test_call_frame_is_not_visible_after_return() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "id", "value": {
      "operator": "lambda", "arguments": ["param"], "body": "$param"
    }},
    {"operator": "id", "arguments": [1]},
    "$param"
  ]));

  assert_eq!(outcome.result, Err(EvalError::UnboundSymbol("param".into())));
}

#[test]
fn test_quote_then_eval_loop() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "n", "value": 5},
    {"operator": "define", "name": "res", "value": 1},
    {"operator": "define", "name": "step", "value": {"operator": "quote", "value": [
      {"operator": "set!", "name": "res", "value": {"operator": "*", "arguments": ["$res", "$n"]}},
      {"operator": "set!", "name": "n", "value": {"operator": "-", "arguments": ["$n", 1]}},
      {"operator": "if",
        "predicate": {"operator": "<", "arguments": [0, "$n"]},
        "then": {"operator": "eval", "code": "$step"},
        "else": 0}
    ]}},
    {"operator": "eval", "code": "$step"},
    "$res"
  ]));

  assert_eq!(outcome.result.unwrap(), Value::from(120));
}

#[test]
fn test_display_output_order() {
  let outcome = run_program(json!([
    {"operator": "display", "arguments": ["hello"]},
    {"operator": "display", "arguments": [{"operator": "+", "arguments": [1, 2]}]},
    {"operator": "display", "arguments": [{"operator": "quote", "value": [1, "two"]}]}
  ]));

  assert_eq!(outcome.result.unwrap(), Value::Null);
  assert_eq!(outcome.output, "hello\n3\n[1, \"two\"]\n");
}

#[test]
fn test_error_aborts_remaining_program() {
  let outcome = run_program(json!([
    {"operator": "display", "arguments": ["before"]},
    {"operator": "display", "arguments": ["$missing"]},
    {"operator": "display", "arguments": ["after"]}
  ]));

  assert_eq!(outcome.result, Err(EvalError::UnboundSymbol("missing".into())));
  assert_eq!(outcome.output, "before\n");
}

#[test]
fn test_user_registered_primitive() {
  let env = Environment::with_builtins().unwrap();
  env
    .define(
      "twice",
      Value::Primitive(Rc::new(Primitive::new("twice", 1, |_, args| {
        Ok(Value::list(vec![args[0].clone(), args[0].clone()]))
      }))),
    )
    .unwrap();

  let mut io = StringIoAdapter::new();
  let result = run(&json!({"operator": "twice", "arguments": ["ab"]}), &env, &mut io);

  assert_eq!(
    result.unwrap(),
    Value::list(vec![Value::from("ab"), Value::from("ab")])
  );
}

#[test]
fn test_programs_share_root_environment() {
  let env = Environment::with_builtins().unwrap();
  let mut io = StringIoAdapter::new();

  run(&json!({"operator": "define", "name": "greeting", "value": "hi"}), &env, &mut io).unwrap();
  let result = run(&json!({"operator": "+", "arguments": ["$greeting", "!"]}), &env, &mut io);

  assert_eq!(result.unwrap(), Value::from("hi!"));
}

#[test]
fn test_failed_define_can_be_retried() {
  let env = Environment::with_builtins().unwrap();
  let mut io = StringIoAdapter::new();

  let first = run(&json!({"operator": "define", "name": "f", "value": "$typo"}), &env, &mut io);
  assert_eq!(first, Err(EvalError::UnboundSymbol("typo".into())));
  assert!(!env.is_defined_locally("f"));

  run(&json!({"operator": "define", "name": "f", "value": 1}), &env, &mut io).unwrap();
  assert_eq!(env.lookup("f").unwrap(), Value::from(1));
}

#[test]
fn test_failed_define_inside_closure_frame_keeps_outer_binding() {
  let outcome = run_program(json!([
    {"operator": "define", "name": "x", "value": "outer"},
    {"operator": "define", "name": "f", "value": {
      "operator": "lambda", "arguments": [], "body": [
        {"operator": "define", "name": "x", "value": {"operator": "/", "arguments": [1, 0]}}
      ]
    }},
    {"operator": "f"}
  ]));

  assert_eq!(outcome.result, Err(EvalError::DivisionByZero));
  assert_eq!(outcome.env.lookup("x").unwrap(), Value::from("outer"));
}
