//! Single-statement execution boundary.
//!
//! # Responsibility
//! - Define the store contract the resource layer depends on.
//! - Run one `QueryStatement` against a SQLite connection.
//!
//! # Invariants
//! - Exactly one statement runs per `execute_statement` call; no retries.
//! - A deadline, when given, is enforced only for that one statement and the
//!   progress handler is removed before returning.

use super::{DbError, DbResult};
use crate::model::record::Row;
use crate::model::value::Value;
use crate::query::builder::QueryStatement;
use rusqlite::{params_from_iter, Connection, ErrorCode};
use std::sync::Arc;
use std::time::Instant;

/// SQLite VM instructions between deadline checks.
const DEADLINE_CHECK_INTERVAL: i32 = 1_000;

/// Rows returned by a statement plus the number of rows it affected or produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOutput {
    pub rows: Vec<Row>,
    pub row_count: usize,
}

/// Executes one parameterized statement.
pub trait Store {
    fn execute_statement(
        &self,
        statement: &QueryStatement,
        deadline: Option<Instant>,
    ) -> DbResult<StoreOutput>;
}

impl Store for Connection {
    fn execute_statement(
        &self,
        statement: &QueryStatement,
        deadline: Option<Instant>,
    ) -> DbResult<StoreOutput> {
        run_statement(self, statement, deadline)
    }
}

impl<S: Store + ?Sized> Store for &S {
    fn execute_statement(
        &self,
        statement: &QueryStatement,
        deadline: Option<Instant>,
    ) -> DbResult<StoreOutput> {
        (**self).execute_statement(statement, deadline)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn execute_statement(
        &self,
        statement: &QueryStatement,
        deadline: Option<Instant>,
    ) -> DbResult<StoreOutput> {
        (**self).execute_statement(statement, deadline)
    }
}

/// Runs `statement` on `conn`, interrupting it once `deadline` passes.
pub fn run_statement(
    conn: &Connection,
    statement: &QueryStatement,
    deadline: Option<Instant>,
) -> DbResult<StoreOutput> {
    let Some(deadline) = deadline else {
        return Ok(collect_output(conn, statement)?);
    };

    if Instant::now() >= deadline {
        return Err(DbError::DeadlineExceeded);
    }

    conn.progress_handler(
        DEADLINE_CHECK_INTERVAL,
        Some(move || Instant::now() >= deadline),
    );
    let result = collect_output(conn, statement);
    conn.progress_handler(0, None::<fn() -> bool>);

    result.map_err(|err| {
        if is_interrupt(&err) {
            DbError::DeadlineExceeded
        } else {
            DbError::Sqlite(err)
        }
    })
}

fn collect_output(conn: &Connection, statement: &QueryStatement) -> rusqlite::Result<StoreOutput> {
    let mut stmt = conn.prepare(&statement.text)?;
    let params = params_from_iter(statement.params.iter());

    if stmt.column_count() == 0 {
        let row_count = stmt.execute(params)?;
        return Ok(StoreOutput {
            rows: Vec::new(),
            row_count,
        });
    }

    let column_names = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = stmt.query(params)?;
    let mut collected = Vec::new();

    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (index, name) in column_names.iter().enumerate() {
            record.insert(name.clone(), Value::from(row.get_ref(index)?));
        }
        collected.push(record);
    }

    Ok(StoreOutput {
        row_count: collected.len(),
        rows: collected,
    })
}

fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::OperationInterrupted
    )
}
