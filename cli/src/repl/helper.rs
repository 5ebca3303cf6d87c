use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

const COMMANDS: &[&str] = &[":help", ":quit", ":exit", ":history", ":env", ":load"];

const OPERATORS: &[&str] = &[
  "define", "set!", "if", "quote", "lambda", "eval", "+", "-", "*", "/", "%", "=", ">", ">=",
  "<", "<=", "display",
];

const OPERATOR_KEY: &str = "\"operator\"";

/// Start of an unfinished `"operator": "..."` value ending at `pos`.
fn operator_value_start(line: &str, pos: usize) -> Option<usize> {
  let before = line.get(..pos)?;
  let key = before.rfind(OPERATOR_KEY)? + OPERATOR_KEY.len();
  let rest = before.get(key..)?.trim_start().strip_prefix(':')?.trim_start();
  let value = rest.strip_prefix('"')?;
  if value.contains('"') {
    return None;
  }
  Some(pos - value.len())
}

fn candidates(words: &[&str], prefix: &str) -> Vec<Pair> {
  words
    .iter()
    .filter(|word| word.starts_with(prefix))
    .map(|word| Pair {
      display: word.to_string(),
      replacement: word.to_string(),
    })
    .collect()
}

pub struct ReplHelper {
  file_completer: FilenameCompleter,
}

impl ReplHelper {
  pub fn new() -> Self {
    Self {
      file_completer: FilenameCompleter::new(),
    }
  }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
  type Candidate = Pair;

  fn complete(
    &self,
    line: &str,
    pos: usize,
    ctx: &Context<'_>,
  ) -> Result<(usize, Vec<Pair>), ReadlineError> {
    if line.starts_with(":l ") || line.starts_with(":load ") {
      // Find the start position of the path argument
      let cmd_end = line.find(' ').map_or(0, |index| index + 1);

      let path_part = line.get(cmd_end..pos).unwrap_or("");

      let (start, candidates) = self
        .file_completer
        .complete(path_part, path_part.len(), ctx)?;

      Ok((cmd_end + start, candidates))
    } else if line.starts_with(':') && !line.contains(' ') {
      let prefix = line.get(..pos).unwrap_or(line);
      Ok((0, candidates(COMMANDS, prefix)))
    } else if let Some(start) = operator_value_start(line, pos) {
      let prefix = line.get(start..pos).unwrap_or("");
      Ok((start, candidates(OPERATORS, prefix)))
    } else {
      Ok((pos, vec![]))
    }
  }
}

impl Hinter for ReplHelper {
  type Hint = String;

  fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
    None
  }
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {}
