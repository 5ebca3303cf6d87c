use std::io::{self, Write};

/// Trait for abstracting program output
/// This allows `display` to write to the console, a buffer, a socket, etc.
pub trait IoAdapter {
  /// Print text to output
  fn print(&mut self, text: &str) -> io::Result<()>;

  /// Print text followed by a newline
  fn println(&mut self, text: &str) -> io::Result<()> {
    self.print(text)?;
    self.print("\n")
  }
}

pub struct StdioAdapter {
  stdout: io::Stdout,
}

impl StdioAdapter {
  pub fn new() -> Self {
    Self {
      stdout: io::stdout(),
    }
  }
}

impl Default for StdioAdapter {
  fn default() -> Self {
    Self::new()
  }
}

impl IoAdapter for StdioAdapter {
  fn print(&mut self, text: &str) -> io::Result<()> {
    write!(self.stdout, "{}", text)?;
    self.stdout.flush()
  }
}

/// Collects output in memory.
#[derive(Debug, Default)]
pub struct StringIoAdapter {
  output: String,
}

impl StringIoAdapter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn output(&self) -> &str {
    &self.output
  }

  pub fn take_output(&mut self) -> String {
    std::mem::take(&mut self.output)
  }
}

impl IoAdapter for StringIoAdapter {
  fn print(&mut self, text: &str) -> io::Result<()> {
    self.output.push_str(text);
    Ok(())
  }
}
