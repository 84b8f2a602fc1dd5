//! Subcommand implementations

mod check;
mod lsp;

pub use check::run_check;
pub use lsp::run_lsp;
