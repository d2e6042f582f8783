use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Configuration for the cms-server binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "cms-server")]
#[command(about = "Single-directory document management service")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "CMS_HOST")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value = "4567", env = "CMS_PORT")]
    pub port: u16,

    /// Directory holding the documents
    #[arg(long, global = true, env = "CMS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON file mapping usernames to password hashes
    #[arg(long, global = true, env = "CMS_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve HTTP requests (default)
    Serve,

    /// Register a user in the credentials file, creating the file if needed
    AddUser {
        #[arg(long)]
        username: String,

        #[arg(long, env = "CMS_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

impl Config {
    fn base_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cms")
    }

    /// Get the effective document directory.
    pub fn effective_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| Self::base_dir().join("data"))
    }

    /// Get the effective credentials file path.
    pub fn effective_credentials_file(&self) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(|| Self::base_dir().join("users.json"))
    }
}
