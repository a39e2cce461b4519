//! journal - Personal journal with PDF attachments on a hosted backend

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "journal=debug,reqwest=debug"
    } else {
        "journal=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Configure { url, anon_key } => {
            cli::commands::configure(url, anon_key)?;
        }
        Commands::Signup { email, password } => {
            cli::commands::signup(email, password).await?;
        }
        Commands::Login { email, password } => {
            cli::commands::login(email, password).await?;
        }
        Commands::Logout => {
            cli::commands::logout().await?;
        }
        Commands::Whoami => {
            cli::commands::whoami().await?;
        }
        Commands::List { json } => {
            cli::commands::list(json).await?;
        }
        Commands::Show { id, json } => {
            cli::commands::show(id, json).await?;
        }
        Commands::New {
            title,
            content,
            attach,
        } => {
            cli::commands::new_entry(title, content, attach).await?;
        }
        Commands::Edit { id, title, content } => {
            cli::commands::edit(id, title, content).await?;
        }
        Commands::Delete { id, yes } => {
            cli::commands::delete(id, yes).await?;
        }
        Commands::Attach { id, file } => {
            cli::commands::attach(id, file).await?;
        }
        Commands::Detach { id, yes } => {
            cli::commands::detach(id, yes).await?;
        }
        Commands::Download { id, out, force } => {
            cli::commands::download(id, out, force).await?;
        }
        Commands::Sanitize { names, json } => {
            cli::commands::sanitize(names, json)?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
