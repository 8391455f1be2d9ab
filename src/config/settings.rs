use crate::adapters::menu_page::DEFAULT_MENU_URL;
use crate::core::schedule::Schedule;
use crate::core::ChecklistTerm;
use crate::utils::error::{Result, WatchError};
use crate::utils::validation::{
    validate_email, validate_non_empty_list, validate_non_empty_string, validate_required_field,
    validate_url, Validate,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

fn default_menu_url() -> String {
    DEFAULT_MENU_URL.to_string()
}

/// Contents of `settings.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub checklist: Vec<String>,
    pub recipient: Option<String>,
    #[serde(default = "default_menu_url")]
    pub menu_url: String,
    /// `{"mon": [11, 20], ...}`; absent means the built-in opening hours.
    pub schedule: Option<BTreeMap<String, [u32; 2]>>,
}

impl Settings {
    /// 從 JSON 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            WatchError::config(format!(
                "cannot read settings file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| WatchError::config(format!("settings JSON parsing error: {}", e)))
    }

    pub fn checklist_terms(&self) -> Vec<ChecklistTerm> {
        self.checklist.iter().map(|t| ChecklistTerm::new(t)).collect()
    }

    pub fn recipient(&self) -> Result<&str> {
        validate_required_field("recipient", &self.recipient).map(String::as_str)
    }

    pub fn schedule(&self) -> Result<Schedule> {
        match &self.schedule {
            Some(table) => Schedule::from_table(table),
            None => Ok(Schedule::default()),
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_list("checklist", &self.checklist)?;
        for term in &self.checklist {
            validate_non_empty_string("checklist", term)?;
        }
        validate_email("recipient", self.recipient()?)?;
        validate_url("menu_url", &self.menu_url)?;
        self.schedule()?;
        Ok(())
    }
}
