use colored::*;
use jexpr::Environment;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::{DefaultHistory, History};
use rustyline::{Editor, Result as RustyResult};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

use super::eval::{EvalError, process_input};
use super::helper::ReplHelper;
use super::input::{
  Feed, InputBuffer, farewell, report_discarded, report_interrupt, report_readline_error,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HISTORY_ENV: &str = "JEXPR_REPL_HISTORY";
const HISTORY_SIZE_ENV: &str = "JEXPR_REPL_HISTORY_SIZE";
const HISTORY_FILE: &str = ".jexpr_history";
const DEFAULT_HISTORY_SIZE: usize = 1000;
const HISTORY_SHOWN: usize = 20;

/// A colon command typed at the top-level prompt.
#[derive(Debug, PartialEq)]
enum Command<'a> {
  Help,
  Quit,
  History,
  Env,
  Load(Option<&'a str>),
}

impl<'a> Command<'a> {
  fn parse(line: &'a str) -> Option<Self> {
    let mut words = line.split_whitespace();
    let command = match words.next()? {
      ":help" => Command::Help,
      ":quit" | ":exit" => Command::Quit,
      ":history" => Command::History,
      ":env" => Command::Env,
      ":l" | ":load" => Command::Load(words.next()),
      _ => return None,
    };
    Some(command)
  }
}

pub struct ReplSession {
  editor: Editor<ReplHelper, DefaultHistory>,
  history_file: PathBuf,
  input: InputBuffer,
}

impl ReplSession {
  pub fn new(env: Rc<Environment>) -> RustyResult<Self> {
    let mut editor = Editor::new()?;
    editor.set_helper(Some(ReplHelper::new()));
    editor.set_max_history_size(history_size())?;

    let history_file = history_file();
    if editor.load_history(&history_file).is_err() {
      debug!(path = %history_file.display(), "no REPL history loaded");
    }

    Ok(Self {
      editor,
      history_file,
      input: InputBuffer::new(env),
    })
  }

  pub fn run(&mut self) -> RustyResult<()> {
    println!(
      "{} {} {}",
      "jexpr".bright_cyan().bold(),
      VERSION.bright_black(),
      "(:help for commands, :quit to exit)".bright_black()
    );

    loop {
      let prompt = self.prompt();
      let line = match self.editor.readline(&prompt) {
        Ok(line) => line,
        Err(ReadlineError::Interrupted) => {
          report_interrupt(&mut self.input);
          continue;
        }
        Err(ReadlineError::Eof) => {
          farewell();
          break;
        }
        Err(err) => {
          report_readline_error(err);
          break;
        }
      };

      if !self.input.is_pending() {
        if line.trim().is_empty() {
          continue;
        }
        if let Some(command) = Command::parse(&line) {
          self.editor.add_history_entry(line.as_str())?;
          if command == Command::Quit {
            farewell();
            break;
          }
          self.run_command(command);
          continue;
        }
      }

      match self.input.feed(&line, &mut self.editor)? {
        Feed::Evaluated(rendered) => {
          for value in rendered.lines() {
            println!("{} {}", "=>".bright_green().bold(), value.bright_white());
          }
        }
        Feed::Pending => {}
        Feed::Failed(msg) => eprintln!("{} {}", "Error:".red().bold(), msg),
        Feed::Discarded => report_discarded(),
      }
    }

    if let Err(e) = self.editor.save_history(&self.history_file) {
      eprintln!("Warning: Could not save history: {}", e);
    }
    Ok(())
  }

  fn prompt(&self) -> String {
    if self.input.is_pending() {
      return "... ".to_string();
    }
    format!(
      "{}{} ",
      "jexpr".bright_cyan(),
      format!("[{}]>", self.input.counter()).bright_black()
    )
  }

  fn run_command(&mut self, command: Command<'_>) {
    match command {
      Command::Help => print_help(),
      Command::History => print_history(self.editor.history()),
      Command::Env => print_environment(self.input.environment()),
      Command::Load(Some(path)) => self.load_file(Path::new(path)),
      Command::Load(None) => eprintln!(
        "{} usage: {} <file>",
        "Error:".red().bold(),
        ":load".bright_green()
      ),
      Command::Quit => {}
    }
  }

  /// Evaluate every document in `path` in the session environment.
  fn load_file(&mut self, path: &Path) {
    let contents = match std::fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(e) => {
        eprintln!(
          "{} cannot read '{}': {}",
          "Error:".red().bold(),
          path.display(),
          e
        );
        return;
      }
    };

    match process_input(&contents, false, self.input.environment()) {
      Ok(last) => {
        println!("{} loaded {}", "ok".bright_green(), path.display());
        println!("{} {}", "=>".bright_green().bold(), last.bright_white());
      }
      Err(EvalError::Incomplete) => eprintln!(
        "{} '{}' ends inside a document",
        "Error:".red().bold(),
        path.display()
      ),
      Err(EvalError::Error(msg)) => {
        eprintln!("{} {}: {}", "Error:".red().bold(), path.display(), msg)
      }
    }
  }
}

fn print_help() {
  let rows = [
    (":help", "show this help"),
    (":quit", "exit (also :exit, Ctrl+D)"),
    (":history", "show recent inputs"),
    (":env", "list root bindings"),
    (":load <file>", "evaluate a file (also :l)"),
  ];
  println!("{}", "Commands".bright_yellow().bold());
  for (command, description) in rows {
    println!("  {:14} {}", command.bright_green(), description);
  }
  println!("{}", "Special forms".bright_yellow().bold());
  println!("  define set! if quote lambda eval");
  println!("{}", "Primitives".bright_yellow().bold());
  println!("  + - * / % = > >= < <= display");
  println!("{}", "Input".bright_yellow().bold());
  println!("  One or more JSON documents; an open document continues on the next line.");
  println!("  A blank line discards it. References are strings such as \"$x\".");
  println!(
    "  {}",
    r#"{"operator": "*", "arguments": [6, 7]}"#.bright_white()
  );
}

fn print_environment(env: &Environment) {
  for name in env.names() {
    let value = env
      .lookup(&name)
      .map(|value| value.to_string())
      .unwrap_or_else(|_| "<unassigned>".to_string());
    println!("  {:12} {}", name.as_str().bright_green(), value);
  }
}

fn print_history(history: &DefaultHistory) {
  if history.is_empty() {
    println!("  {}", "no history yet".bright_black().italic());
    return;
  }
  let start = history.len().saturating_sub(HISTORY_SHOWN);
  for (i, entry) in history.iter().enumerate().skip(start) {
    println!("  {} {}", format!("{:>4}", i + 1).bright_black(), entry);
  }
}

fn history_file() -> PathBuf {
  if let Ok(path) = std::env::var(HISTORY_ENV) {
    return PathBuf::from(path);
  }
  dirs::home_dir()
    .map(|home| home.join(HISTORY_FILE))
    .unwrap_or_else(|| PathBuf::from(HISTORY_FILE))
}

fn history_size() -> usize {
  std::env::var(HISTORY_SIZE_ENV)
    .ok()
    .and_then(|s| s.parse().ok())
    .unwrap_or(DEFAULT_HISTORY_SIZE)
}
