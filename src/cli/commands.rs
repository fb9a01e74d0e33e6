//! CLI commands and argument parsing

use crate::feed::{DEFAULT_FEED_FILE, DEFAULT_FEED_URL};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Catalog sync CLI
#[derive(Parser, Debug)]
#[command(name = "catalog-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Where to read the product feed from
    #[arg(long, global = true, value_enum, default_value = "file")]
    pub source: SourceKind,

    /// Feed file to read, or to back the API feed up to
    #[arg(long, global = true, default_value = DEFAULT_FEED_FILE)]
    pub file: PathBuf,

    /// Feed URL used with `--source api`
    #[arg(long, global = true, default_value = DEFAULT_FEED_URL)]
    pub api: String,

    /// Settings file (YAML)
    #[arg(short = 'S', long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: Commands,
}

/// Secrets, normally supplied through the environment
#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    /// Catalog API consumer key
    #[arg(long, env = "WC_CONSUMER_KEY", hide_env_values = true)]
    pub consumer_key: Option<String>,

    /// Catalog API consumer secret
    #[arg(long, env = "WC_CONSUMER_SECRET", hide_env_values = true)]
    pub consumer_secret: Option<String>,

    /// Store URL
    #[arg(long, env = "APP_URL")]
    pub app_url: Option<String>,

    /// Supplier feed token
    #[arg(long, env = "TARSUS_KEY", hide_env_values = true)]
    pub feed_token: Option<String>,

    /// Media API user (defaults to the consumer key)
    #[arg(long, env = "APP_USER")]
    pub app_user: Option<String>,

    /// Media API password (defaults to the consumer secret)
    #[arg(long, env = "APP_PWD", hide_env_values = true)]
    pub app_password: Option<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the remote catalog against the feed
    Sync {
        /// Compute and count changes without sending any
        #[arg(long)]
        dry_run: bool,

        /// Leave categories untouched
        #[arg(long)]
        skip_categories: bool,

        /// Leave products untouched
        #[arg(long)]
        skip_products: bool,
    },

    /// Probe the remote catalog and print entity counts
    Check,
}

/// Feed source selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    /// Local JSON file
    File,
    /// Supplier API
    Api,
}
