//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::browser::{Session, SessionConfig};
use crate::config::{CollectLimits, SelectorProfile, Timing};
use crate::feeds::FeedKind;
use crate::runner::{self, CrawlOptions, CrawlTarget};

#[derive(Parser)]
#[command(name = "trendscrape")]
#[command(about = "Headless-browser crawler for incrementally-loading trend feeds")]
#[command(version)]
pub struct Cli {
    /// Run the browser with a visible window (headless is the default)
    #[arg(long, global = true)]
    headed: bool,

    /// DevTools URL of an already-running Chrome to attach to
    #[arg(long, global = true, env = "TRENDSCRAPE_REMOTE_URL")]
    remote_url: Option<String>,

    /// JSON selector profile overriding the built-in selectors
    #[arg(long, global = true, env = "TRENDSCRAPE_SELECTORS")]
    selectors: Option<PathBuf>,

    /// Stop after collecting this many unique items
    #[arg(short, long, global = true, default_value = "100")]
    limit: usize,

    /// Full re-runs granted after an unresolved verification challenge
    #[arg(long, global = true, default_value = "1")]
    retries: usize,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Collect trending video cards from a feed page
    Videos {
        /// Feed page URL
        url: String,
    },
    /// Collect trending hashtag tiles from a feed page
    Hashtags {
        /// Feed page URL
        url: String,
    },
    /// Collect trending audio tiles from a feed page
    Audio {
        /// Feed page URL
        url: String,
    },
    /// Collect comment threads from a video page
    Comments {
        /// Video page URL
        url: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let profile = match &cli.selectors {
        Some(path) => SelectorProfile::from_file(path)?,
        None => SelectorProfile::default(),
    };

    let opts = CrawlOptions {
        limits: CollectLimits::with_target(cli.limit),
        timing: Timing::default(),
        profile,
        concurrency: 1,
        retries: cli.retries,
    };

    let (url, kind) = match &cli.command {
        Commands::Videos { url } => (url.clone(), FeedKind::Videos),
        Commands::Hashtags { url } => (url.clone(), FeedKind::Hashtags),
        Commands::Audio { url } => (url.clone(), FeedKind::Audio),
        Commands::Comments { url } => (url.clone(), FeedKind::Comments),
    };

    let session = Session::start(&SessionConfig {
        headless: !cli.headed,
        remote_url: cli.remote_url.clone(),
        chrome_args: Vec::new(),
    })
    .await?;

    let target = CrawlTarget { url, kind };
    let result = runner::crawl_target(&session, &target, &opts).await;
    session.close().await.ok();

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
