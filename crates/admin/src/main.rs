//! create-admin - provision an administrative account

use anyhow::Context;
use clap::Parser;
use lumen_admin::{collect_input, create_admin, Args, CommandError, TerminalPrompter, TerminalState};
use lumen_common::{
    config::AppConfig,
    db::{schema, DbPool, Repository},
    users::UserService,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Console tool: quiet unless RUST_LOG asks otherwise, and never on stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        schema::create_schema(db.write()).await?;
    }
    let service = UserService::new(Repository::new(db));

    // Prompts block on stdin, so Ctrl-C is watched from the async side
    let terminal = TerminalState::capture();
    let prompts = tokio::task::spawn_blocking(move || collect_input(&args, &mut TerminalPrompter));
    let collected = tokio::select! {
        joined = prompts => joined.context("Prompt task failed")?,
        _ = tokio::signal::ctrl_c() => Err(CommandError::Cancelled),
    };

    let outcome = match collected {
        Ok(input) => create_admin(&service, input).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(user) => {
            println!("Superuser \"{}\" created successfully.", user.username);
            Ok(())
        }
        Err(err) => {
            match err {
                CommandError::Cancelled => {
                    // The prompt thread may still be parked with echo off
                    if let Some(terminal) = &terminal {
                        terminal.restore();
                    }
                    println!("\n{}", err);
                }
                _ => eprintln!("Error: {}", err),
            }
            std::process::exit(err.exit_code());
        }
    }
}
