use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Haven inbox command-line interface
#[derive(Parser, Debug)]
#[command(name = "haven-inbox")]
#[command(about = "Group, store and follow Haven direct messages", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Also write logs to a daily rotating file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that works on the message store
#[derive(clap::Args, Debug, Clone)]
pub struct StoreArgs {
    /// SQLite database path (defaults to HAVEN_INBOX_DB or haven-inbox.db)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// Options for commands that act as a particular user
#[derive(clap::Args, Debug, Clone)]
pub struct UserArgs {
    /// Current user id (defaults to HAVEN_INBOX_USER)
    #[arg(long, value_name = "ID")]
    pub user: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Group a JSON message feed into conversations and print them as JSON
    Group {
        #[command(flatten)]
        user: UserArgs,

        /// JSON file holding a message array (or {"messages": [...]})
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Load a JSON message feed into the store
    Import {
        #[command(flatten)]
        store: StoreArgs,

        #[arg(long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Add or update a user profile in the store
    AddUser {
        #[command(flatten)]
        store: StoreArgs,

        #[arg(long)]
        id: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },

    /// Send a direct message
    Send {
        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        user: UserArgs,

        /// Recipient user id
        #[arg(long)]
        to: String,

        #[arg(long)]
        content: String,
    },

    /// Print one line per conversation, most recent first
    Inbox {
        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        user: UserArgs,
    },

    /// Mark every message from a counterpart as read
    MarkRead {
        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        user: UserArgs,

        /// Counterpart user id
        #[arg(long = "with", value_name = "ID")]
        counterpart: String,
    },

    /// Poll the store and print the inbox whenever it changes
    Watch {
        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        user: UserArgs,

        /// Polling period in seconds (defaults to HAVEN_INBOX_POLL_SECS or 30)
        #[arg(long, value_name = "SECS")]
        poll_secs: Option<String>,
    },
}
