use crate::core::scheduler::{FetchFailurePolicy, SchedulerOptions};
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_range, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "menu-watch")]
#[command(about = "Watch a restaurant's online menu and email when a dish is available")]
pub struct CliConfig {
    /// Directory holding settings, credentials, token and log files
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Settings file (default: <data-dir>/settings.json)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// OAuth client secrets file (default: <data-dir>/credentials.json)
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Stored OAuth token file (default: <data-dir>/token.json)
    #[arg(long)]
    pub token: Option<PathBuf>,

    /// Log file (default: <data-dir>/bot.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Hours between checks
    #[arg(long, default_value = "1")]
    pub period: u64,

    /// Ignore opening hours and send the report even if nothing is available
    #[arg(long)]
    pub force: bool,

    /// Run a single check and exit
    #[arg(long)]
    pub once: bool,

    /// Run the browser authorization flow, save the token and exit
    #[arg(long)]
    pub authorize: bool,

    /// Never start the browser authorization flow
    #[arg(long)]
    pub no_interactive: bool,

    /// Keep polling when the menu page cannot be fetched
    #[arg(long)]
    pub skip_failed_fetch: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON log lines on stdout
    #[arg(long)]
    pub json_logs: bool,
}

impl CliConfig {
    fn in_data_dir(&self, explicit: &Option<PathBuf>, default_name: &str) -> PathBuf {
        explicit
            .clone()
            .unwrap_or_else(|| self.data_dir.join(default_name))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.in_data_dir(&self.settings, "settings.json")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.in_data_dir(&self.credentials, "credentials.json")
    }

    pub fn token_path(&self) -> PathBuf {
        self.in_data_dir(&self.token, "token.json")
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.in_data_dir(&self.log_file, "bot.log")
    }

    pub fn fetch_failure_policy(&self) -> FetchFailurePolicy {
        if self.skip_failed_fetch {
            FetchFailurePolicy::Skip
        } else {
            FetchFailurePolicy::Stop
        }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions::from_hours(self.period, self.force, self.fetch_failure_policy())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_range("period", self.period, 1, 24 * 7)?;
        for (field, path) in [
            ("settings", self.settings_path()),
            ("credentials", self.credentials_path()),
            ("token", self.token_path()),
            ("log_file", self.log_file_path()),
        ] {
            validate_path(field, &path.to_string_lossy())?;
        }
        Ok(())
    }
}
