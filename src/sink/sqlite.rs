//! SQLite sink implementation

use crate::crawler::ProductRecord;
use crate::sink::schema::initialize_schema;
use crate::sink::traits::{RecordSink, SinkError, SinkResult};
use crate::sink::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed record sink
///
/// Records are written against the run opened with `start_run`.
pub struct SqliteSink {
    conn: Mutex<Connection>,
    run_id: Mutex<Option<i64>>,
}

impl SqliteSink {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            run_id: Mutex::new(None),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            run_id: Mutex::new(None),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_run(&self) -> Option<i64> {
        *self
            .run_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== Run Management =====

    /// Opens a new run; subsequent records belong to it
    pub fn start_run(&self, config_hash: &str) -> SinkResult<i64> {
        let now = Utc::now().to_rfc3339();
        let id = {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
                params![now, config_hash, RunStatus::Running.to_db_string()],
            )?;
            conn.last_insert_rowid()
        };

        *self
            .run_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(id);
        Ok(id)
    }

    /// Closes the current run with `status`
    pub fn finish_run(&self, status: RunStatus) -> SinkResult<()> {
        let run_id = self
            .current_run()
            .ok_or_else(|| SinkError::Database("No run in progress".to_string()))?;

        let now = Utc::now().to_rfc3339();
        let updated = self.conn().execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(SinkError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> SinkResult<Option<RunRecord>> {
        let run = self
            .conn()
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Failed),
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    /// Number of products stored for `run_id`, or across all runs
    pub fn count_products(&self, run_id: Option<i64>) -> SinkResult<u64> {
        let count: i64 = match run_id {
            Some(id) => self.conn().query_row(
                "SELECT COUNT(*) FROM products WHERE run_id = ?1",
                params![id],
                |row| row.get(0),
            )?,
            None => self
                .conn()
                .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    /// Product counts per (category, sub-category) for a run, sorted by name
    pub fn products_by_category(&self, run_id: i64) -> SinkResult<Vec<(String, String, u64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT category, sub_category, COUNT(*) FROM products
             WHERE run_id = ?1
             GROUP BY category, sub_category
             ORDER BY category, sub_category",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as u64))
        })?;

        let collected = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(collected)
    }

    /// Records of a run with at least one product field unset
    pub fn count_partial_products(&self, run_id: i64) -> SinkResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM products WHERE run_id = ?1 AND
             (name IS NULL OR price_amount IS NULL OR price_cup IS NULL OR size IS NULL OR url IS NULL)",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// All records of a run, in insertion order
    pub fn load_products(&self, run_id: i64) -> SinkResult<Vec<ProductRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, price_amount, price_cup, size, url, category, sub_category,
             page_number, page_url
             FROM products WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok(ProductRecord {
                name: row.get(0)?,
                price_amount: row.get(1)?,
                price_cup: row.get(2)?,
                size: row.get(3)?,
                url: row.get(4)?,
                category: row.get(5)?,
                sub_category: row.get(6)?,
                page_number: row.get(7)?,
                page_url: row.get(8)?,
            })
        })?;

        let collected = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(collected)
    }
}

impl RecordSink for SqliteSink {
    fn store(&self, record: &ProductRecord) -> SinkResult<()> {
        let run_id = self
            .current_run()
            .ok_or_else(|| SinkError::Database("No run in progress".to_string()))?;

        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO products (run_id, name, price_amount, price_cup, size, url,
             category, sub_category, page_number, page_url, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id,
                record.name,
                record.price_amount,
                record.price_cup,
                record.size,
                record.url,
                record.category,
                record.sub_category,
                record.page_number,
                record.page_url,
                now
            ],
        )?;
        Ok(())
    }
}
