use crate::core::{Availability, ChecklistTerm, MatchResult, MenuItem, Report};

/// Classify every checklist match in the menu.
///
/// Items are visited in menu order and each is tested against every term.
/// A term that matched nothing anywhere in the menu gets a single
/// `Not found!` entry labelled with the term itself, after all matched items.
/// Items sharing a name collapse into one entry: the later item's state wins
/// and the entry keeps its first position. `notify` is read off that final
/// report.
pub fn match_menu(items: &[MenuItem], checklist: &[ChecklistTerm]) -> MatchResult {
    let mut report = Report::new();
    let mut hits = vec![0usize; checklist.len()];

    for item in items {
        let mut matched = false;
        for (idx, term) in checklist.iter().enumerate() {
            if !term.matches(&item.name) {
                continue;
            }
            hits[idx] += 1;
            matched = true;
        }

        if matched {
            tracing::debug!("Item '{}': {:?}", item.name, item.attributes);
            let availability = item.availability();
            if availability == Availability::Available {
                tracing::info!("Item '{}' available, email will be sent", item.name);
            }
            report.insert(&item.name, availability);
        }
    }

    for (term, count) in checklist.iter().zip(&hits) {
        if *count == 0 {
            report.insert(term.as_str(), Availability::NotFound);
        }
    }

    let notify = report.has_available();
    MatchResult { report, notify }
}
