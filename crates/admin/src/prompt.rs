//! Console prompts
//!
//! End of input and interrupted reads are reported as `Cancelled` so the
//! command can abort quietly.

use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input cancelled")]
    Cancelled,

    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

impl PromptError {
    fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted => PromptError::Cancelled,
            _ => PromptError::Io(err),
        }
    }
}

/// Source of answers for the provisioning flow
pub trait Prompter {
    /// Visible input, trailing newline removed
    fn ask(&mut self, label: &str) -> Result<String, PromptError>;

    /// Input without echo
    fn ask_secret(&mut self, label: &str) -> Result<String, PromptError>;
}

/// Reads from the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, label: &str) -> Result<String, PromptError> {
        let mut stdout = io::stdout();
        write!(stdout, "{}: ", label)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).map_err(PromptError::from_io)?;
        if read == 0 {
            return Err(PromptError::Cancelled);
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn ask_secret(&mut self, label: &str) -> Result<String, PromptError> {
        rpassword::prompt_password(format!("{}: ", label)).map_err(PromptError::from_io)
    }
}

/// Replays canned answers; running out behaves like end of input
#[cfg(test)]
pub(crate) struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, label: &str) -> Result<String, PromptError> {
        self.asked.push(label.to_string());
        self.answers.pop_front().ok_or(PromptError::Cancelled)
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn ask(&mut self, label: &str) -> Result<String, PromptError> {
        self.next(label)
    }

    fn ask_secret(&mut self, label: &str) -> Result<String, PromptError> {
        self.next(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_and_interrupt_are_cancellation() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(PromptError::from_io(eof), PromptError::Cancelled));

        let interrupted = io::Error::new(io::ErrorKind::Interrupted, "^C");
        assert!(matches!(PromptError::from_io(interrupted), PromptError::Cancelled));

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "tty");
        assert!(matches!(PromptError::from_io(other), PromptError::Io(_)));
    }

    #[test]
    fn test_scripted_prompter_runs_dry() {
        let mut prompter = ScriptedPrompter::new(&["one"]);
        assert_eq!(prompter.ask("First").unwrap(), "one");
        assert!(matches!(prompter.ask_secret("Second"), Err(PromptError::Cancelled)));
        assert_eq!(prompter.asked, vec!["First", "Second"]);
    }
}
