//! LSP request/notification handlers.

mod code_action;
mod documents;
mod initialize;

pub use code_action::handle_code_action;
pub use documents::{handle_did_change, handle_did_close, handle_did_open, handle_did_save};
pub use initialize::{handle_initialize, handle_initialized, handle_shutdown};
