//! CLI module for journal

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod auth;
pub mod commands;

pub use auth::SessionManager;

#[derive(Parser, Debug)]
#[command(name = "journal", about = "Personal journal with PDF attachments")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure the backend URL and anon key
    Configure {
        /// Backend project URL
        #[arg(long, env = "SUPABASE_URL")]
        url: Option<String>,

        /// Public anon key of the project
        #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
        anon_key: Option<String>,
    },

    /// Create an account
    Signup {
        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long, env = "JOURNAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign in and store the session in the system keyring
    Login {
        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long, env = "JOURNAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List entries, newest first
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an entry and its attachment
    Show {
        /// Entry id
        id: String,

        /// Print the entry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an entry
    New {
        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        content: ContentArgs,

        /// PDF to attach to the new entry
        #[arg(short, long, value_name = "PDF")]
        attach: Option<PathBuf>,
    },

    /// Edit the title or content of an entry
    Edit {
        /// Entry id
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Delete an entry and its attachment
    Delete {
        /// Entry id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Attach a PDF to an entry, replacing any existing attachment
    Attach {
        /// Entry id
        id: String,

        /// PDF file (max 2MB)
        #[arg(value_name = "PDF")]
        file: PathBuf,
    },

    /// Remove the attachment of an entry
    Detach {
        /// Entry id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Download the attachment of an entry
    Download {
        /// Entry id
        id: String,

        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check filenames the way attachments are checked before upload
    Sanitize {
        /// Filenames to check
        #[arg(required = true)]
        names: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Where the body of an entry comes from
#[derive(clap::Args, Debug, Default)]
#[group(multiple = false)]
pub struct ContentArgs {
    /// Entry text
    #[arg(short, long)]
    pub content: Option<String>,

    /// Read the entry text from a file (`-` for stdin)
    #[arg(long, value_name = "FILE")]
    pub content_file: Option<PathBuf>,
}
