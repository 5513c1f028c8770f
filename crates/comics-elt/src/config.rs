//! Configuration management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::{env_parsed, DbConfig};

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default base URL of the comic API.
pub const DEFAULT_SOURCE_URL: &str = "https://xkcd.com";

/// Default per-request timeout in seconds.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 100;

/// Comic number the source never assigned (xkcd has no comic 404).
pub const DEFAULT_SKIP_ID: i64 = 404;

/// Default number of rows per write statement.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default run schedule: midnight UTC on Monday, Wednesday and Friday.
/// Six-field cron syntax (seconds first).
pub const DEFAULT_SCHEDULE: &str = "0 0 0 * * Mon,Wed,Fri";

/// Default path of the historical CSV export.
pub const DEFAULT_EXPORT_PATH: &str = "./comics.csv";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DbConfig,
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
}

/// Comic API settings
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Identifier that is never fetched
    pub skip_id: i64,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            skip_id: DEFAULT_SKIP_ID,
        }
    }
}

/// Staging, scheduling and export settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub schedule: String,
    pub export_path: PathBuf,
}

impl PipelineConfig {
    pub fn cron_schedule(&self) -> anyhow::Result<cron::Schedule> {
        cron::Schedule::from_str(&self.schedule)
            .map_err(|e| anyhow::anyhow!("Invalid COMICS_SCHEDULE '{}': {}", self.schedule, e))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            schedule: DEFAULT_SCHEDULE.to_string(),
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
        }
    }
}

impl Config {
    /// Load `.env` (if present), then read the environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Build configuration from environment variables over the defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let source_defaults = SourceConfig::default();
        let pipeline_defaults = PipelineConfig::default();

        let config = Config {
            database: DbConfig::from_env()?,
            source: SourceConfig {
                base_url: std::env::var("COMICS_SOURCE_URL")
                    .unwrap_or(source_defaults.base_url),
                timeout_secs: env_parsed("COMICS_SOURCE_TIMEOUT_SECS")
                    .unwrap_or(source_defaults.timeout_secs),
                skip_id: env_parsed("COMICS_SKIP_ID").unwrap_or(source_defaults.skip_id),
            },
            pipeline: PipelineConfig {
                chunk_size: env_parsed("COMICS_CHUNK_SIZE").unwrap_or(pipeline_defaults.chunk_size),
                schedule: std::env::var("COMICS_SCHEDULE").unwrap_or(pipeline_defaults.schedule),
                export_path: std::env::var("COMICS_EXPORT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(pipeline_defaults.export_path),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if !self.source.base_url.starts_with("http://")
            && !self.source.base_url.starts_with("https://")
        {
            anyhow::bail!("COMICS_SOURCE_URL must be an http(s) URL, got '{}'", self.source.base_url);
        }

        if self.source.timeout_secs == 0 {
            anyhow::bail!("COMICS_SOURCE_TIMEOUT_SECS must be greater than 0");
        }

        if self.source.skip_id < 1 {
            anyhow::bail!("COMICS_SKIP_ID must be a positive comic number");
        }

        if self.pipeline.chunk_size == 0 {
            anyhow::bail!("COMICS_CHUNK_SIZE must be greater than 0");
        }

        self.pipeline.cron_schedule()?;

        Ok(())
    }
}
