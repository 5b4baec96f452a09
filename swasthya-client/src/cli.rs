use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $SWASTHYA_CONFIG
  3) XDG default: ~/.config/swasthya/client.yaml

Without a subcommand, shows the dashboard for the logged-in user.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "swasthya-client",
    version,
    about = "Dashboard client for the child health screening server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Optional subcommand. Without one, shows the dashboard.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in to the server and save the token in the keyring
    Login {
        /// Server URL (e.g., http://127.0.0.1:5180). Falls back to config or prompt.
        #[arg(long)]
        server: Option<String>,
        /// Username. Falls back to prompt.
        #[arg(long)]
        username: Option<String>,
    },
    /// Show the dashboard: stats plus the record table, newest first
    Dashboard {
        /// Case-insensitive match against child name, school or anganwadi kendra
        #[arg(long)]
        filter: Option<String>,
    },
    /// Submit a new screening record, then show the refreshed dashboard
    Add {
        #[arg(long)]
        child_name: String,
        #[arg(long)]
        age: i32,
        /// Male, Female or Other
        #[arg(long)]
        gender: String,
        /// Weight in kilograms
        #[arg(long)]
        weight: f64,
        /// Initial status (default: Pending)
        #[arg(long, default_value = "Pending")]
        status: String,
        #[arg(long)]
        kendra: String,
        #[arg(long)]
        school: String,
        #[arg(long)]
        symptoms: Option<String>,
    },
    /// Change the health status of one record, then show the refreshed dashboard
    SetStatus {
        /// Record id
        id: i32,
        /// New status, e.g. Checked, Referred, Treated, "Follow-up Required"
        status: String,
    },
}
