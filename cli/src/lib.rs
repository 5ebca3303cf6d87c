mod repl;

use clap::{Parser, Subcommand};
use jexpr::{Environment, StdioAdapter, Value};
use serde_json::Deserializer;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::repl::ReplSession;

/// Stack size for the evaluation thread. Recursion in programs is host recursion.
pub const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

const LOG_ENV: &str = "JEXPR_LOG";
const PRELUDE_ENV: &str = "JEXPR_PRELUDE";
const PRELUDE_FILE: &str = "prelude.json";

#[derive(Parser)]
#[command(name = "jexpr")]
#[command(about = "jexpr - An evaluator for JSON-encoded symbolic expressions", long_about = None)]
#[command(version)]
pub struct Cli {
  /// Do not load the prelude into the root environment
  #[arg(long, global = true)]
  pub no_prelude: bool,

  #[command(subcommand)]
  pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
  /// Start an interactive REPL
  Repl,
  /// Run jexpr programs
  Run {
    /// Evaluate a JSON program given on the command line
    #[arg(short, long, conflicts_with = "files")]
    eval: Option<String>,
    /// Print the value of the last program
    #[arg(short, long)]
    print: bool,
    /// Program files (multiple files share one root environment)
    #[arg(value_name = "FILES")]
    files: Vec<String>,
  },
}

/// Install a stderr subscriber when `JEXPR_LOG` or `RUST_LOG` is set.
pub fn init_tracing() {
  let directives = std::env::var(LOG_ENV).or_else(|_| std::env::var("RUST_LOG"));
  if let Ok(directives) = directives {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::new(directives))
      .with_writer(std::io::stderr)
      .with_target(true)
      .try_init();
  }
}

fn get_prelude_path() -> Option<PathBuf> {
  if let Ok(path) = std::env::var(PRELUDE_ENV) {
    let path_buf = PathBuf::from(path);
    if path_buf.exists() {
      return Some(path_buf);
    }
  }

  let mut default_paths = vec![PathBuf::from(PRELUDE_FILE)];

  if let Some(mut home) = dirs::home_dir() {
    home.push(".jexpr");
    home.push(PRELUDE_FILE);
    default_paths.push(home);
  }

  if let Ok(mut exe_path) = std::env::current_exe() {
    exe_path.pop();
    exe_path.push(PRELUDE_FILE);
    default_paths.push(exe_path);
  }

  default_paths.into_iter().find(|p| p.exists())
}

/// Evaluate the prelude, if one can be found, into `env`.
pub fn load_prelude(env: &Rc<Environment>) -> Result<(), String> {
  let Some(path) = get_prelude_path() else {
    return Ok(());
  };

  debug!(path = %path.display(), "loading prelude");
  let contents = std::fs::read_to_string(&path)
    .map_err(|e| format!("Failed to read prelude '{}': {}", path.display(), e))?;
  evaluate_source(&contents, env)
    .map_err(|e| format!("Error loading prelude '{}': {}", path.display(), e))?;
  Ok(())
}

/// Root environment with the builtins and, unless disabled, the prelude.
pub fn root_environment(no_prelude: bool) -> Result<Rc<Environment>, String> {
  let env = Environment::with_builtins().map_err(|e| e.to_string())?;
  if !no_prelude {
    load_prelude(&env)?;
  }
  Ok(env)
}

/// Parse every JSON document in `input`. Nothing is returned unless all of
/// them parse.
pub fn read_programs(input: &str) -> Result<Vec<serde_json::Value>, serde_json::Error> {
  Deserializer::from_str(input)
    .into_iter::<serde_json::Value>()
    .collect()
}

/// Evaluate the JSON programs in `input` in order in `env` and return the
/// value of the last one, `null` when there are none.
pub fn evaluate_source(input: &str, env: &Rc<Environment>) -> Result<Value, String> {
  let programs = read_programs(input).map_err(|e| format!("Invalid JSON: {}", e))?;
  let mut io = StdioAdapter::new();
  let mut last = Value::Null;
  for program in &programs {
    last = jexpr::run(program, env, &mut io).map_err(|e| e.to_string())?;
  }
  Ok(last)
}

pub fn run_repl(no_prelude: bool) -> Result<(), String> {
  let env = root_environment(no_prelude)?;
  let mut session =
    ReplSession::new(env).map_err(|e| format!("Failed to initialize REPL: {}", e))?;
  session.run().map_err(|e| format!("REPL error: {}", e))
}

pub fn run_eval(expression: &str, print: bool, no_prelude: bool) -> Result<(), String> {
  let env = root_environment(no_prelude)?;
  let result = evaluate_source(expression, &env)?;
  if print {
    println!("{}", result);
  }
  Ok(())
}

pub fn run_files(paths: &[String], print: bool, no_prelude: bool) -> Result<(), String> {
  let env = root_environment(no_prelude)?;
  let mut last = Value::Null;

  for path in paths {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| format!("Failed to read file '{}': {}", path, e))?;
    last = evaluate_source(&contents, &env).map_err(|e| format!("{}: {}", path, e))?;
  }

  if print {
    println!("{}", last);
  }
  Ok(())
}

/// Dispatch a parsed command line.
pub fn execute(cli: Cli) -> Result<(), String> {
  match cli.command {
    Some(Commands::Repl) | None => run_repl(cli.no_prelude),
    Some(Commands::Run { eval, print, files }) => match (eval, files.is_empty()) {
      (Some(expr), _) => run_eval(&expr, print, cli.no_prelude),
      (None, false) => run_files(&files, print, cli.no_prelude),
      (None, true) => Err("Either --eval or file paths must be provided".to_string()),
    },
  }
}
