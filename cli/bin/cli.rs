use clap::Parser;
use cli::{Cli, EVAL_STACK_SIZE, execute, init_tracing};
use colored::*;
use std::{process, thread};

fn main() {
  let cli = Cli::parse();
  init_tracing();

  let result = thread::Builder::new()
    .name("jexpr-eval".to_string())
    .stack_size(EVAL_STACK_SIZE)
    .spawn(move || execute(cli))
    .map_err(|e| format!("Failed to spawn evaluation thread: {}", e))
    .and_then(|handle| {
      handle
        .join()
        .map_err(|_| "Evaluation thread panicked".to_string())?
    });

  if let Err(e) = result {
    eprintln!("{} {}", "Error:".red().bold(), e);
    process::exit(1);
  }
}
