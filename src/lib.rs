//! seashell: a small interactive shell.
//!
//! Lines are read from the terminal in raw mode, parsed into a [`Pipeline`]
//! of commands, and either handled in-process (`exit`, `cd` and a handful of
//! utilities) or run as child processes connected by pipes, with `<`, `>`
//! and `>>` redirects and `&` for background jobs.
//!
//! The entry point is [`Interpreter`].

pub mod builtin;
pub mod command;
pub mod config;
pub mod env;
mod external;
mod interpreter;
mod io_adapters;
mod lexer;
pub mod logging;
pub mod parser;
pub mod process;
mod prompt;
pub mod reader;

pub use command::{Command, ExitCode, ExitSignal, Pipeline};
pub use config::Config;
pub use env::Session;
pub use external::PathResolver;
pub use interpreter::Interpreter;
pub use io_adapters::MemWriter;
pub use parser::parse;
pub use reader::{LineHistory, LineReader, LineResult};
