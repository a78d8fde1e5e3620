//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The pipeline calls store methods, it never executes SQL directly.

use crate::{
    error::{FunnelError, FunnelResult},
    metrics::read_canonical,
    types::{CanonicalRow, NUMERIC_COLUMNS},
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

mod preview;

pub use preview::{LeadsPreview, RoiPreview};

pub struct FunnelStore {
    conn: Connection,
}

/// Result of loading one cleaned file into its table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded { table: String, rows: usize },
    Failed { table: String, error: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

impl FunnelStore {
    /// Open (or create) the database at `path`.
    /// Foreign keys stay unenforced, as in a plain sqlite3 session.
    pub fn open(path: &Path) -> FunnelResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FunnelResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    // ── Bulk load ──────────────────────────────────────────────

    /// Drop `table` if it exists and recreate it holding exactly `rows`.
    /// The drop, create and inserts share one transaction.
    pub fn replace_table(&self, table: &str, rows: &[CanonicalRow]) -> FunnelResult<usize> {
        let ident = quote_ident(table)?;
        let numeric_defs: Vec<String> =
            NUMERIC_COLUMNS.iter().map(|c| format!("{c} REAL")).collect();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {ident};
             CREATE TABLE {ident} (campaign TEXT, channel TEXT, {});",
            numeric_defs.join(", ")
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {ident}
                    (campaign, channel, impressions, clicks, leads, conversions, cost, revenue)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))?;
            for r in rows {
                stmt.execute(params![
                    r.campaign,
                    r.channel,
                    r.impressions,
                    r.clicks,
                    r.leads,
                    r.conversions,
                    r.cost,
                    r.revenue,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Load each `(table, cleaned file)` pair. A failure on one table does
    /// not stop the others.
    pub fn load_tables(&self, sources: &[(&str, &Path)]) -> Vec<LoadOutcome> {
        sources
            .iter()
            .map(|(table, path)| {
                let result = read_canonical(path).and_then(|rows| self.replace_table(table, &rows));
                match result {
                    Ok(rows) => {
                        log::info!("table '{table}' replaced with {rows} rows from {}", path.display());
                        LoadOutcome::Loaded { table: table.to_string(), rows }
                    }
                    Err(e) => {
                        log::error!("failed to write table '{table}': {e}");
                        LoadOutcome::Failed { table: table.to_string(), error: e.to_string() }
                    }
                }
            })
            .collect()
    }

    // ── Script ─────────────────────────────────────────────────

    /// Run a multi-statement script in autocommit mode. Statements that ran
    /// before a failing one stay applied.
    pub fn execute_script(&self, sql: &str) -> FunnelResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    // ── Inspection ─────────────────────────────────────────────

    pub fn table_exists(&self, table: &str) -> FunnelResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn row_count(&self, table: &str) -> FunnelResult<i64> {
        let ident = quote_ident(table)?;
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {ident}"), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Every row of a table loaded by `replace_table`, in insertion order.
    pub fn canonical_rows(&self, table: &str) -> FunnelResult<Vec<CanonicalRow>> {
        let ident = quote_ident(table)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT campaign, channel, impressions, clicks, leads, conversions, cost, revenue
             FROM {ident} ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(CanonicalRow {
                campaign:    row.get(0)?,
                channel:     row.get(1)?,
                impressions: row.get(2)?,
                clicks:      row.get(3)?,
                leads:       row.get(4)?,
                conversions: row.get(5)?,
                cost:        row.get(6)?,
                revenue:     row.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Double-quoted identifier, restricted to `[A-Za-z_][A-Za-z0-9_]*`.
fn quote_ident(name: &str) -> FunnelResult<String> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(FunnelError::InvalidTableName { name: name.to_string() });
    }
    Ok(format!("\"{name}\""))
}
