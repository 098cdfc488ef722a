use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use storefront_core::StoreBackend;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(version, about = "Storefront - shop from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides STOREFRONT_API_BASE_URL and the config file)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Credential storage backend: file, keyring or memory
    #[arg(long, global = true)]
    pub store: Option<StoreBackend>,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Defaults to the last username used
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Create an account, then log into it
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the current user as reported by the server
    Whoami,

    /// Show the stored session without contacting the server
    Status,

    /// Send an arbitrary request through the authenticated pipeline
    Request(RequestArgs),

    /// List products
    Products,

    /// Show the cart
    Cart,

    /// List orders
    Orders,
}

#[derive(Args)]
pub struct RequestArgs {
    /// GET, POST, PUT, PATCH or DELETE
    pub method: String,

    /// Server-relative path, e.g. /orders/
    pub path: String,

    /// JSON body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Extra header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Fail with "session expired" instead of retrying anonymously
    #[arg(long)]
    pub no_anonymous_fallback: bool,
}
