//! Engine module: CLI surface and run orchestration.

pub mod arg_parser;
pub mod handlers;

pub use arg_parser::Cli;
pub use handlers::handle_run;
