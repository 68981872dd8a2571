use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::db::{LoadRunRecord, LoadRunStatus, ModuleLoadRecord};
use crate::mods::ModWarning;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed history of load runs.
#[derive(Debug)]
pub struct LedgerDb {
    conn: Connection,
}

impl LedgerDb {
    /// Open (or create) the ledger and bring its schema up to date.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> DbResult<i32> {
        current_schema_version(&self.conn)
    }

    /// Store a run with its modules and messages in one transaction; returns the run id.
    pub fn record_load(
        &self,
        run: &LoadRunRecord,
        modules: &[ModuleLoadRecord],
        messages: &[String],
    ) -> DbResult<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO load_runs (mod_id, entry_module, status, reason, warnings, started_at, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                run.mod_id,
                run.entry_module,
                run.status.as_str(),
                run.reason,
                run.warnings.bits(),
                run.started_at,
                run.finished_at
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        for module in modules {
            tx.execute(
                r#"
                INSERT INTO load_modules (run_id, module, file, status, rewritten, sha256)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![run_id, module.module, module.file, module.status, module.rewritten, module.sha256],
            )?;
        }
        for (ordinal, message) in messages.iter().enumerate() {
            tx.execute(
                "INSERT INTO load_messages (run_id, ordinal, message) VALUES (?1, ?2, ?3)",
                params![run_id, ordinal as i64, message],
            )?;
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// List runs, oldest first, optionally filtered by mod id.
    pub fn list_runs(&self, mod_id: Option<&str>) -> DbResult<Vec<LoadRunRecord>> {
        fn map_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoadRunRecord> {
            let status: String = row.get(3)?;
            let warnings: u32 = row.get(5)?;
            Ok(LoadRunRecord {
                id: Some(row.get(0)?),
                mod_id: row.get(1)?,
                entry_module: row.get(2)?,
                status: status.parse::<LoadRunStatus>()?,
                reason: row.get(4)?,
                warnings: ModWarning::from_bits_truncate(warnings),
                started_at: row.get(6)?,
                finished_at: row.get(7)?,
            })
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, mod_id, entry_module, status, reason, warnings, started_at, finished_at
            FROM load_runs
            WHERE ?1 IS NULL OR mod_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![mod_id], map_run)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn list_modules(&self, run_id: i64) -> DbResult<Vec<ModuleLoadRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT module, file, status, rewritten, sha256
            FROM load_modules
            WHERE run_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok(ModuleLoadRecord {
                module: row.get(0)?,
                file: row.get(1)?,
                status: row.get(2)?,
                rewritten: row.get(3)?,
                sha256: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn list_messages(&self, run_id: i64) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT message FROM load_messages WHERE run_id = ?1 ORDER BY ordinal")?;
        let rows = stmt.query_map(params![run_id], |row| row.get(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Apply schema migrations, tracked by `PRAGMA user_version`.
///
/// Version map:
/// - 0: no schema
/// - 1: load_runs, load_modules
/// - 2: load_messages
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS load_runs (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                mod_id       TEXT NOT NULL,
                entry_module TEXT NOT NULL,
                status       TEXT NOT NULL,
                reason       TEXT,
                warnings     INTEGER NOT NULL DEFAULT 0,
                started_at   TEXT NOT NULL,
                finished_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS load_modules (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id    INTEGER NOT NULL REFERENCES load_runs(id) ON DELETE CASCADE,
                module    TEXT NOT NULL,
                file      TEXT NOT NULL,
                status    TEXT NOT NULL,
                rewritten INTEGER NOT NULL DEFAULT 0,
                sha256    TEXT
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS load_messages (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id  INTEGER NOT NULL REFERENCES load_runs(id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL,
                message TEXT NOT NULL
            );

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
