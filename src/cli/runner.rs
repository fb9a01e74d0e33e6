//! CLI runner - executes commands

use crate::auth::AuthConfig;
use crate::catalog::CatalogClient;
use crate::cli::commands::{Cli, Commands, Credentials, SourceKind};
use crate::config::Settings;
use crate::engine::{Phases, SyncEngine, SyncStats};
use crate::error::{Error, Result};
use crate::feed::FeedSource;
use crate::http::{HttpClient, Transport};
use crate::media::MediaClient;
use crate::types::EntityKind;
use std::sync::Arc;
use tracing::info;

/// How a completed command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing went wrong
    Success,
    /// The run finished but recorded errors
    CompletedWithErrors,
}

impl RunStatus {
    /// Process exit code: 0 on success, 2 when errors were recorded
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::CompletedWithErrors => 2,
        }
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<RunStatus> {
        let settings = self.load_settings()?;
        match &self.cli.command {
            Commands::Sync {
                dry_run,
                skip_categories,
                skip_products,
            } => {
                let phases = Phases {
                    categories: !skip_categories,
                    products: !skip_products,
                };
                self.sync(&settings, *dry_run, phases).await
            }
            Commands::Check => self.check(&settings).await,
        }
    }

    fn load_settings(&self) -> Result<Settings> {
        match &self.cli.settings {
            Some(path) => Settings::load(path),
            None => Ok(Settings::default()),
        }
    }

    async fn sync(&self, settings: &Settings, dry_run: bool, phases: Phases) -> Result<RunStatus> {
        let catalog = self.catalog(settings)?;
        let feed = self.feed_source()?.load().await?;

        if dry_run {
            info!("dry run: no changes will be sent");
        }
        let engine = SyncEngine::new(catalog).with_config(settings.sync_config(dry_run));
        let stats = engine.run_feed(&feed, phases).await;

        print_summary(&stats);
        Ok(if stats.has_errors() {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Success
        })
    }

    async fn check(&self, settings: &Settings) -> Result<RunStatus> {
        let catalog = self.catalog(settings)?;
        for kind in [EntityKind::Category, EntityKind::Product] {
            let count = catalog.item_count(kind).await?;
            println!("{}: {count}", kind.plural());
        }
        Ok(RunStatus::Success)
    }

    /// Catalog client with basic auth; the media API may use its own pair
    fn catalog(&self, settings: &Settings) -> Result<CatalogClient> {
        let credentials = &self.cli.credentials;
        let base_url = credentials
            .app_url
            .as_deref()
            .or(settings.catalog.base_url.as_deref())
            .ok_or_else(|| Error::missing_field("APP_URL"))?;
        let key = required(credentials.consumer_key.as_deref(), "WC_CONSUMER_KEY")?;
        let secret = required(credentials.consumer_secret.as_deref(), "WC_CONSUMER_SECRET")?;
        let (user, password) = media_credentials(credentials, key, secret);

        let http_config = settings.http_config(Some(base_url));
        let policy = settings.retry_policy();
        info!(url = base_url, "syncing towards catalog");

        let transport: Arc<dyn Transport> = Arc::new(
            HttpClient::with_auth(http_config.clone(), AuthConfig::basic(key, secret))?
                .with_policy(policy.clone()),
        );
        let media: Arc<dyn Transport> = Arc::new(
            HttpClient::with_auth(http_config, AuthConfig::basic(user, password))?
                .with_policy(policy),
        );
        Ok(CatalogClient::new(transport, MediaClient::new(media)))
    }

    fn feed_source(&self) -> Result<FeedSource> {
        Ok(match self.cli.source {
            SourceKind::File => FeedSource::File(self.cli.file.clone()),
            SourceKind::Api => FeedSource::Api {
                url: self.cli.api.clone(),
                token: required(self.cli.credentials.feed_token.as_deref(), "TARSUS_KEY")?
                    .to_string(),
                backup: Some(self.cli.file.clone()),
            },
        })
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::missing_field(name))
}

/// Media API credentials, falling back to the consumer pair
fn media_credentials<'a>(
    credentials: &'a Credentials,
    key: &'a str,
    secret: &'a str,
) -> (&'a str, &'a str) {
    match (
        credentials.app_user.as_deref().filter(|u| !u.is_empty()),
        credentials.app_password.as_deref().filter(|p| !p.is_empty()),
    ) {
        (Some(user), Some(password)) => (user, password),
        _ => (key, secret),
    }
}

fn print_summary(stats: &SyncStats) {
    println!("Sync finished in {:.1}s", stats.duration.as_secs_f64());
    for report in &stats.reports {
        println!("  {report}");
    }
    if !stats.has_errors() {
        return;
    }

    println!("{} error(s):", stats.error_count());
    for report in &stats.reports {
        for message in &report.errors {
            println!("  [{}] {message}", report.kind.plural());
        }
    }
}
