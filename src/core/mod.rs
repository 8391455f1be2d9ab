pub mod matcher;
pub mod notifier;
pub mod schedule;
pub mod scheduler;
pub mod watch;

pub use crate::domain::model::{
    Availability, ChecklistTerm, CycleOutcome, Delivery, MatchResult, MenuItem, Report,
    ReportEntry,
};
pub use crate::domain::ports::{Clock, CredentialProvider, Mailer, MenuSource, Sleeper};
pub use crate::utils::error::Result;
