use serde::Deserialize;
use std::fmt;

/// Attribute tag the menu uses to mark an item as unavailable.
pub const SOLD_OUT_TAG: &str = "SOLD_OUT";

/// A single dish as published in the menu page's embedded JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub attributes: Vec<String>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, attributes: &[&str]) -> Self {
        Self {
            name: name.into(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.attributes.iter().any(|a| a == SOLD_OUT_TAG)
    }

    pub fn availability(&self) -> Availability {
        if self.is_sold_out() {
            Availability::SoldOut
        } else {
            Availability::Available
        }
    }
}

/// A lowercase phrase to look for in menu item names. Whitespace is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChecklistTerm(String);

impl ChecklistTerm {
    pub fn new(term: &str) -> Self {
        Self(term.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring test against an item name.
    pub fn matches(&self, item_name: &str) -> bool {
        item_name.to_lowercase().contains(&self.0)
    }
}

impl fmt::Display for ChecklistTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    SoldOut,
    NotFound,
}

impl Availability {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::SoldOut => "Sold out",
            Self::NotFound => "Not found!",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: String,
    pub availability: Availability,
}

/// Ordered name -> availability mapping built fresh every cycle.
///
/// Inserting a name that is already present updates its state but keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, availability: Availability) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.availability = availability,
            None => self.entries.push(ReportEntry {
                name: name.to_string(),
                availability,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<Availability> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.availability)
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_available(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.availability == Availability::Available)
    }
}

/// Output of the matcher for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub report: Report,
    pub notify: bool,
}

/// What happened to the report email in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { message_id: String },
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub result: MatchResult,
    pub delivery: Delivery,
}
