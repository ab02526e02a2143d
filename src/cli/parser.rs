use clap::{Parser, Subcommand};

/// Command-line interface definition for KinTouch
/// Smartcard attendance terminal backed by SQLite
#[derive(Parser)]
#[command(
    name = "kintouch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Smartcard attendance terminal: clock instructors in and out per channel on a SQLite ledger",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Show or check the configuration file
    Config {
        #[arg(long = "print", help = "Print the effective configuration")]
        print_config: bool,

        #[arg(long = "check", help = "Report keys missing from the configuration file")]
        check: bool,
    },

    /// Register an instructor's card
    Register {
        /// Card UID as reported by the reader (e.g. "04 12 AB CD")
        uid: String,

        /// Display name
        name: String,

        #[arg(long = "id", help = "Instructor number (default: next free number)")]
        id: Option<i64>,
    },

    /// List registered instructors
    Instructors,

    /// Print the next free instructor number
    NextId,

    /// Import instructors from a CSV file (instructor_id,card_uid,name)
    Import {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Process a single card tap
    Scan {
        uid: String,

        #[arg(long, short, default_value = "class")]
        channel: String,

        #[arg(long = "at", help = "Scan time (YYYY-MM-DD HH:MM:SS), default: now")]
        at: Option<String>,
    },

    /// Watch the configured readers until interrupted (Ctrl-C)
    Monitor {
        #[arg(
            long = "channel",
            short,
            help = "Only start readers for these channels (repeatable)"
        )]
        channels: Vec<String>,
    },

    /// Register a compensating IN/OUT for an instructor
    Correct {
        #[arg(long = "id", help = "Instructor number")]
        id: i64,

        #[arg(long = "direction", help = "in or out")]
        direction: String,

        #[arg(long, short, default_value = "class")]
        channel: String,

        #[arg(long = "at", help = "Event time (YYYY-MM-DD HH:MM:SS), default: now")]
        at: Option<String>,
    },

    /// List the events of a day on a channel
    List {
        #[arg(long, short, default_value = "class")]
        channel: String,

        #[arg(long, short, help = "Day to list (YYYY-MM-DD), default: today")]
        date: Option<String>,

        #[arg(long = "summary", help = "Show per-instructor status for the day")]
        summary: bool,

        #[arg(long = "json", help = "Print events as JSON")]
        json: bool,
    },

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,

        #[arg(long = "limit", help = "Only the most recent N rows")]
        limit: Option<usize>,
    },
}
