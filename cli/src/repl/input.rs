use colored::*;
use jexpr::Environment;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::{Editor, Helper, Result as RustyResult};
use std::rc::Rc;

use super::eval::{EvalError, process_input};

/// Accumulates lines until they form complete JSON documents.
pub struct InputBuffer {
  pending: String,
  evaluated: usize,
  env: Rc<Environment>,
}

/// Outcome of feeding one line into the buffer.
pub enum Feed {
  Evaluated(String),
  Pending,
  Failed(String),
  Discarded,
}

impl InputBuffer {
  pub fn new(env: Rc<Environment>) -> Self {
    Self {
      pending: String::new(),
      evaluated: 0,
      env,
    }
  }

  /// Number of the next input to be evaluated.
  pub fn counter(&self) -> usize {
    self.evaluated + 1
  }

  pub fn is_pending(&self) -> bool {
    !self.pending.is_empty()
  }

  pub fn discard(&mut self) {
    self.pending.clear();
  }

  pub fn environment(&self) -> &Rc<Environment> {
    &self.env
  }

  /// Append `line` and evaluate once the buffer parses. A blank line while
  /// a document is open drops it.
  pub fn feed<H: Helper, I: History>(
    &mut self,
    line: &str,
    editor: &mut Editor<H, I>,
  ) -> RustyResult<Feed> {
    if self.is_pending() && line.trim().is_empty() {
      self.discard();
      return Ok(Feed::Discarded);
    }

    if self.is_pending() {
      self.pending.push('\n');
    }
    self.pending.push_str(line);

    let outcome = match process_input(&self.pending, true, &self.env) {
      Err(EvalError::Incomplete) => return Ok(Feed::Pending),
      Ok(rendered) => {
        self.evaluated += 1;
        Feed::Evaluated(rendered)
      }
      Err(EvalError::Error(msg)) => Feed::Failed(msg),
    };

    editor.add_history_entry(self.pending.as_str())?;
    self.pending.clear();
    Ok(outcome)
  }
}

pub fn report_interrupt(buffer: &mut InputBuffer) {
  println!("{}", "^C".yellow());
  buffer.discard();
}

pub fn report_discarded() {
  println!("{}", "incomplete input discarded".bright_black().italic());
}

pub fn farewell() {
  println!("\n{}", "Bye.".bright_cyan().italic());
}

pub fn report_readline_error(err: ReadlineError) {
  eprintln!("{} {:?}", "Error:".red().bold(), err);
}
