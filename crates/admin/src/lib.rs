//! Lumen console tools
//!
//! `create-admin` provisions a staff + superuser account from flags or
//! interactive prompts.

pub mod command;
pub mod prompt;
pub mod terminal;

pub use command::{collect_input, create_admin, Args, CommandError};
pub use prompt::{PromptError, Prompter, TerminalPrompter};
pub use terminal::TerminalState;
