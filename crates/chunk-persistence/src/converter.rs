//! Mapeo entre el modelo del core y las filas de `batch_*_execution`.
//!
//! - Estados y códigos de salida se guardan como texto estable
//!   (`BatchStatus::as_str`, `ExitCode::as_str`).
//! - Los contadores `u64` se guardan como `BIGINT`; un valor fuera de rango es
//!   un documento inválido.
//! - El `ExecutionContext` se guarda completo como JSONB
//!   (`{ "map": {...}, "dirty": bool }`).

use chrono::{DateTime, Utc};
use chunk_core::{BatchStatus, ExecutionContext, ExitCode, ExitStatus, StepCounts, StepExecution};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::schema::{batch_job_execution, batch_step_execution};

/// Fila completa de `batch_step_execution` (orden de columnas del schema).
#[derive(Debug, Queryable)]
pub struct StepRow {
    pub step_execution_id: Uuid,
    pub job_execution_id: Uuid,
    pub step_name: String,
    pub status: String,
    pub exit_code: String,
    pub exit_description: String,
    pub read_count: i64,
    pub write_count: i64,
    pub filter_count: i64,
    pub commit_count: i64,
    pub rollback_count: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub failures: Value,
    pub execution_context: Value,
}

/// Fila para insertar un step nuevo (incluye el contexto inicial).
#[derive(Debug, Insertable)]
#[diesel(table_name = batch_step_execution)]
pub struct NewStepRow<'a> {
    pub step_execution_id: Uuid,
    pub job_execution_id: Uuid,
    pub step_name: &'a str,
    pub status: &'a str,
    pub exit_code: &'a str,
    pub exit_description: &'a str,
    pub read_count: i64,
    pub write_count: i64,
    pub filter_count: i64,
    pub commit_count: i64,
    pub rollback_count: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub failures: Value,
    pub execution_context: Value,
}

/// Cambios de estado/contadores; no toca `execution_context`.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = batch_step_execution)]
pub struct StepStateChangeset<'a> {
    pub status: &'a str,
    pub exit_code: &'a str,
    pub exit_description: &'a str,
    pub read_count: i64,
    pub write_count: i64,
    pub filter_count: i64,
    pub commit_count: i64,
    pub rollback_count: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub failures: Value,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = batch_job_execution)]
pub struct NewJobRow<'a> {
    pub job_execution_id: Uuid,
    pub job_name: &'a str,
    pub execution_context: Value,
}

fn to_column(value: u64, column: &str) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|_| PersistenceError::Corrupt(format!("{column} out of range: {value}")))
}

fn from_column(value: i64, column: &str) -> Result<u64, PersistenceError> {
    u64::try_from(value).map_err(|_| PersistenceError::Corrupt(format!("negative {column}: {value}")))
}

pub fn context_to_json(context: &ExecutionContext) -> Result<Value, PersistenceError> {
    Ok(serde_json::to_value(context)?)
}

/// `NULL` o documento vacío se leen como contexto vacío.
pub fn context_from_json(value: Value) -> Result<ExecutionContext, PersistenceError> {
    if value.is_null() || value.as_object().is_some_and(|o| o.is_empty()) {
        return Ok(ExecutionContext::new());
    }
    let mut context: ExecutionContext = serde_json::from_value(value)?;
    // lo leído ya está persistido
    context.clear_dirty();
    Ok(context)
}

pub fn new_step_row(se: &StepExecution) -> Result<NewStepRow<'_>, PersistenceError> {
    let counts = se.counts();
    Ok(NewStepRow { step_execution_id: se.id,
                    job_execution_id: se.job_execution_id,
                    step_name: &se.step_name,
                    status: se.status().as_str(),
                    exit_code: se.exit_status().code.as_str(),
                    exit_description: &se.exit_status().description,
                    read_count: to_column(counts.read, "read_count")?,
                    write_count: to_column(counts.write, "write_count")?,
                    filter_count: to_column(counts.filter, "filter_count")?,
                    commit_count: to_column(counts.commit, "commit_count")?,
                    rollback_count: to_column(counts.rollback, "rollback_count")?,
                    start_time: se.start_time(),
                    end_time: se.end_time(),
                    last_updated: se.last_updated(),
                    failures: serde_json::to_value(se.failures())?,
                    execution_context: context_to_json(se.execution_context())? })
}

pub fn step_changeset(se: &StepExecution) -> Result<StepStateChangeset<'_>, PersistenceError> {
    let counts = se.counts();
    Ok(StepStateChangeset { status: se.status().as_str(),
                            exit_code: se.exit_status().code.as_str(),
                            exit_description: &se.exit_status().description,
                            read_count: to_column(counts.read, "read_count")?,
                            write_count: to_column(counts.write, "write_count")?,
                            filter_count: to_column(counts.filter, "filter_count")?,
                            commit_count: to_column(counts.commit, "commit_count")?,
                            rollback_count: to_column(counts.rollback, "rollback_count")?,
                            start_time: se.start_time(),
                            end_time: se.end_time(),
                            last_updated: se.last_updated(),
                            failures: serde_json::to_value(se.failures())? })
}

/// Reconstruye un `StepExecution` (con su contexto) desde una fila.
pub fn step_from_row(row: StepRow) -> Result<StepExecution, PersistenceError> {
    let counts = StepCounts { read: from_column(row.read_count, "read_count")?,
                              write: from_column(row.write_count, "write_count")?,
                              filter: from_column(row.filter_count, "filter_count")?,
                              commit: from_column(row.commit_count, "commit_count")?,
                              rollback: from_column(row.rollback_count, "rollback_count")? };
    let exit_status = ExitStatus { code: ExitCode::parse(&row.exit_code),
                                   description: row.exit_description };
    let mut se = StepExecution::restore(row.step_execution_id,
                                        row.job_execution_id,
                                        row.step_name,
                                        BatchStatus::parse(&row.status),
                                        exit_status,
                                        counts,
                                        row.start_time,
                                        row.end_time,
                                        row.last_updated);
    let failures: Vec<String> = serde_json::from_value(row.failures)?;
    for failure in failures {
        se.add_failure(failure);
    }
    se.set_execution_context(context_from_json(row.execution_context)?);
    Ok(se)
}
