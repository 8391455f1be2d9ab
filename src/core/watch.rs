use crate::core::matcher::match_menu;
use crate::core::notifier::Notifier;
use crate::core::{ChecklistTerm, CycleOutcome, Mailer, MenuSource};
use crate::utils::error::{Result, WatchError};
use tracing::instrument;

/// Fetch -> match -> notify, once.
pub struct WatchEngine<S: MenuSource, M: Mailer> {
    source: S,
    checklist: Vec<ChecklistTerm>,
    notifier: Notifier<M>,
}

impl<S: MenuSource, M: Mailer> WatchEngine<S, M> {
    /// The checklist must not be empty; this is checked here as well as at
    /// config load so an engine can never run without terms.
    pub fn new(source: S, checklist: Vec<ChecklistTerm>, notifier: Notifier<M>) -> Result<Self> {
        if checklist.is_empty() {
            return Err(WatchError::config("Checklist cannot be empty!"));
        }
        Ok(Self {
            source,
            checklist,
            notifier,
        })
    }

    /// Only a failed fetch is an error; delivery problems end up in
    /// `CycleOutcome::delivery`.
    #[instrument(name = "cycle", skip(self))]
    pub async fn run_cycle(&self, force: bool) -> Result<CycleOutcome> {
        let items = self.source.fetch_menu().await?;
        tracing::debug!("Fetched {} menu items", items.len());

        let result = match_menu(&items, &self.checklist);
        let delivery = self.notifier.notify(&result, force).await;

        Ok(CycleOutcome { result, delivery })
    }
}
