use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::mods::ModWarning;

/// Outcome of one load run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadRunStatus {
    Loaded,
    Rejected,
}

impl LoadRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadRunStatus::Loaded => "loaded",
            LoadRunStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for LoadRunStatus {
    type Err = rusqlite::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loaded" => Ok(LoadRunStatus::Loaded),
            "rejected" => Ok(LoadRunStatus::Rejected),
            _ => Err(rusqlite::Error::InvalidQuery),
        }
    }
}

/// One `load` call as recorded in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadRunRecord {
    /// Row id; `None` until stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub mod_id: String,
    pub entry_module: String,
    pub status: LoadRunStatus,
    /// Rejection reason, if any.
    pub reason: Option<String>,
    pub warnings: ModWarning,
    pub started_at: String,
    pub finished_at: String,
}

/// Per-module row of a load run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleLoadRecord {
    pub module: String,
    pub file: String,
    /// Parse status (`okay`, `already_loaded`, `failed`).
    pub status: String,
    pub rewritten: bool,
    pub sha256: Option<String>,
}
