pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::Settings;

pub use crate::adapters::clock::{SystemClock, TokioSleeper};
pub use crate::adapters::credentials::{
    ChainedProvider, InteractiveProvider, StoredTokenProvider, TokenStore,
};
pub use crate::adapters::gmail::GmailMailer;
pub use crate::adapters::menu_page::MenuPageSource;
pub use crate::core::notifier::Notifier;
pub use crate::core::scheduler::{Scheduler, SchedulerState};
pub use crate::core::watch::WatchEngine;
pub use crate::utils::error::{Result, WatchError};
