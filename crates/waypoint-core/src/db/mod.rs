//! Database operations and SQLite management for plans, phases and tasks.
//!
//! This module holds the low-level, synchronous store. Every state-machine
//! mutation is a single conditional `UPDATE` (match on id and expected
//! status, mutate, bump `version`) executed inside an `IMMEDIATE`
//! transaction, so two connections racing on the same record serialise
//! instead of losing updates.

use std::{path::Path, time::Duration};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{DatabaseResultExt, Result};

pub mod migrations;
pub mod phase_queries;
pub mod plan_queries;
pub mod progress_queries;
pub mod task_queries;

mod rows;
mod work_items;

pub(crate) use work_items::WorkKind;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .db_context("Failed to configure busy timeout")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Begins a write transaction that takes the database write lock up front.
    fn write_transaction(&mut self) -> Result<Transaction<'_>> {
        self.connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")
    }
}
