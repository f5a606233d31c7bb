use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "beehub", about = "Student portal login and course registration bot")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct CredentialArgs {
    /// Portal e-mail address
    #[arg(long, env = "BEEHUB_EMAIL")]
    pub email: String,

    /// Portal password
    #[arg(long, env = "BEEHUB_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in to the portal and report the session
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Print the bearer token
        #[arg(long)]
        print_token: bool,
    },
    /// Register for courses, falling back to reserves
    Pick {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// JSON file of the form {"courses": [{"crn": "...", "reserves": [...]}]}
        #[arg(short = 'f', long)]
        courses: PathBuf,
    },
    /// Show the logged-in student's profile
    Profile {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Include the base64 photo in the output
        #[arg(long)]
        with_photo: bool,
    },
    /// Fetch the merged course catalog
    Courses {
        /// Write the catalog as JSON instead of printing a count
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
