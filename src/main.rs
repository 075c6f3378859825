//! # xharvest
//!
//! Command-line entry point. Scrapes the posts of every user listed in a
//! users file and writes them, with follow mutuality, to a CSV file.
//!
//! ## Environment Variables
//!
//! - `xapi_access_token`: X API v2 bearer token (required)
//! - `XAPI_BASE_URL`: API host (defaults to `https://api.x.com`)
//! - `RUST_LOG`: log filter (defaults to `info`)
//!
//! ## Usage
//!
//! ```bash
//! xharvest accounts.txt users.py 200 out.csv
//!
//! # Shorter pauses and cooldown
//! XHARVEST_COOLDOWN_SECS=60 xharvest --pause-max-secs 2 accounts.txt users.py 200 out.csv
//! ```

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;

use xharvest::{
    load_credentials, load_target_users, save_csv, scrape_tweets, PacingConfig, TokioPacer,
    XApiClient, XApiConfig,
};

/// Scrape posts and follow graphs of target users into a CSV file.
#[derive(Debug, Parser)]
#[command(name = "xharvest", version, about)]
struct Cli {
    /// Credentials file, one `login:password:email:email_password` per line
    credentials: PathBuf,

    /// File containing a `users = [...]` list of target handles
    users_path: PathBuf,

    /// Maximum posts, followers and following fetched per user
    text_limit: usize,

    /// Output CSV path
    path_to_save: PathBuf,

    /// Shortest random pause between accounts and users, in seconds
    #[arg(long, env = "XHARVEST_PAUSE_MIN_SECS", default_value_t = 1)]
    pause_min_secs: u64,

    /// Longest random pause between accounts and users, in seconds
    #[arg(long, env = "XHARVEST_PAUSE_MAX_SECS", default_value_t = 3)]
    pause_max_secs: u64,

    /// Wait after a rate limit before the single retry, in seconds
    #[arg(long, env = "XHARVEST_COOLDOWN_SECS", default_value_t = 900)]
    cooldown_secs: u64,

    /// Attempts made by the exponential backoff
    #[arg(long, env = "XHARVEST_RETRIES", default_value_t = 3)]
    retries: u32,
}

impl Cli {
    fn pacing(&self) -> PacingConfig {
        PacingConfig {
            pause_min: Duration::from_secs(self.pause_min_secs),
            pause_max: Duration::from_secs(self.pause_max_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
            retries: self.retries,
            ..PacingConfig::default()
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let credentials = load_credentials(&cli.credentials)?;
    let targets = load_target_users(&cli.users_path)?;
    let api_config = XApiConfig::from_env()?;
    let mut client = XApiClient::new(&api_config)?;
    let pacing = cli.pacing();

    info!(
        "Starting scrape of {} users with {} accounts (limit {})",
        targets.len(),
        credentials.len(),
        cli.text_limit
    );

    let rows = scrape_tweets(
        &mut client,
        &TokioPacer,
        &credentials,
        &targets,
        cli.text_limit,
        &pacing,
    )
    .await?;

    let written = save_csv(rows, &cli.path_to_save)?;
    info!("Wrote {} rows to {}", written, cli.path_to_save.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize the logging system
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Scrape failed: {}", e);
        std::process::exit(1);
    }
}
