mod eval;
mod helper;
mod input;
mod session;

pub use session::ReplSession;
