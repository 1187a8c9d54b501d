//! The `create-admin` flow: gather account fields, confirm the password,
//! then create a staff + superuser account.

use clap::Parser;
use lumen_common::{
    db::models::User,
    errors::AppError,
    users::{CreateUser, UserService},
};
use thiserror::Error;
use tracing::info;

use crate::prompt::{PromptError, Prompter};

/// Command-line arguments for create-admin
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "create-admin")]
#[command(about = "Create an administrative (staff + superuser) account")]
#[command(version)]
pub struct Args {
    /// Email address (login name)
    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long = "first_name")]
    pub first_name: Option<String>,

    #[arg(long = "last_name")]
    pub last_name: Option<String>,

    /// Password; skips the confirmation prompt. Prefer the prompt on shared machines.
    #[arg(long)]
    pub password: Option<String>,

    /// Prompt for every field not given as a flag
    #[arg(long)]
    pub interactive: bool,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Operation cancelled.")]
    Cancelled,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("{0}")]
    Account(#[from] AppError),

    #[error("{0}")]
    Prompt(String),
}

impl From<PromptError> for CommandError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => CommandError::Cancelled,
            PromptError::Io(e) => CommandError::Prompt(e.to_string()),
        }
    }
}

impl CommandError {
    /// Cancellation is a clean exit, everything else is a failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Cancelled => 0,
            _ => 1,
        }
    }
}

/// Flag value if present, otherwise a prompt when `prompt` is set
fn field(
    value: &Option<String>,
    label: &str,
    prompt: bool,
    prompter: &mut dyn Prompter,
) -> Result<Option<String>, CommandError> {
    match value {
        Some(v) => Ok(Some(v.trim().to_string())),
        None if prompt => Ok(Some(prompter.ask(label)?.trim().to_string())),
        None => Ok(None),
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, CommandError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::MissingField { field: name.to_string() }.into())
}

/// Gather the account fields. Email and username are prompted for when
/// missing; names only with `--interactive`. Without `--password` the
/// password is read twice and both entries must match.
pub fn collect_input(args: &Args, prompter: &mut dyn Prompter) -> Result<CreateUser, CommandError> {
    let email = required(field(&args.email, "Email address", true, prompter)?, "email")?;
    let username = required(field(&args.username, "Username", true, prompter)?, "username")?;
    let first_name = field(&args.first_name, "First name", args.interactive, prompter)?.unwrap_or_default();
    let last_name = field(&args.last_name, "Last name", args.interactive, prompter)?.unwrap_or_default();

    let password = match &args.password {
        Some(password) => password.clone(),
        None => {
            let first = prompter.ask_secret("Password")?;
            let second = prompter.ask_secret("Password (again)")?;
            if first != second {
                return Err(CommandError::PasswordMismatch);
            }
            first
        }
    };

    Ok(CreateUser {
        email,
        username,
        first_name,
        last_name,
        password,
    })
}

/// Create the privileged account
pub async fn create_admin(service: &UserService, input: CreateUser) -> Result<User, CommandError> {
    let user = service.create_superuser(input).await?;
    info!(user_id = %user.id, "Administrative account provisioned");
    Ok(user)
}
