//! Host configuration, on-disk layout and the load ledger.
//!
//! - `LoaderSettings`: serializable loader configuration (`.modshim/settings.json`).
//! - `HostLayout`: computed paths under a game directory.
//! - `LedgerDb`: SQLite history of load runs, schema tracked by `PRAGMA user_version`.
//! - `HostContext`: layout, settings and an open ledger bundled together.

pub mod config;
pub mod context;
pub mod layout;
pub mod ledger;
pub mod models;
pub mod util;

pub use config::{LedgerConfig, LoaderSettings};
pub use context::HostContext;
pub use layout::HostLayout;
pub use ledger::{DbError, DbResult, LedgerDb, CURRENT_SCHEMA_VERSION};
pub use models::{LoadRunRecord, LoadRunStatus, ModuleLoadRecord};
pub use util::{load_settings, open_ledger, write_settings};
