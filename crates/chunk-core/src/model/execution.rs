use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ExecutionContext, ExitStatus, StepContribution};

/// Estado de ejecución de un step.
///
/// Las transiciones habituales son:
/// - `Starting` -> `Started`
/// - `Started` -> `Completed` | `Failed` | `Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Starting,
    Started,
    Stopping,
    Stopped,
    Completed,
    Failed,
    Abandoned,
    Unknown,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Started => "STARTED",
            BatchStatus::Stopping => "STOPPING",
            BatchStatus::Stopped => "STOPPED",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
            BatchStatus::Abandoned => "ABANDONED",
            BatchStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(status: &str) -> Self {
        match status {
            "STARTING" => BatchStatus::Starting,
            "STARTED" => BatchStatus::Started,
            "STOPPING" => BatchStatus::Stopping,
            "STOPPED" => BatchStatus::Stopped,
            "COMPLETED" => BatchStatus::Completed,
            "FAILED" => BatchStatus::Failed,
            "ABANDONED" => BatchStatus::Abandoned,
            _ => BatchStatus::Unknown,
        }
    }

    pub fn is_unsuccessful(self) -> bool {
        matches!(self, BatchStatus::Failed | BatchStatus::Stopped | BatchStatus::Abandoned)
    }
}

/// Agregado por ejecución de step.
///
/// Los contadores sólo cambian al aplicar contribuciones y al registrar
/// commits/rollbacks; el orquestador es el único que los muta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: Uuid,
    pub job_execution_id: Uuid,
    pub step_name: String,
    status: BatchStatus,
    exit_status: ExitStatus,
    read_count: u64,
    write_count: u64,
    filter_count: u64,
    commit_count: u64,
    rollback_count: u64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
    terminate_only: bool,
    failures: Vec<String>,
    // se persiste como documento aparte
    #[serde(skip)]
    execution_context: ExecutionContext,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>, job_execution_id: Uuid) -> Self {
        Self::with_id(Uuid::new_v4(), step_name, job_execution_id)
    }

    pub fn with_id(id: Uuid, step_name: impl Into<String>, job_execution_id: Uuid) -> Self {
        Self { id,
               job_execution_id,
               step_name: step_name.into(),
               status: BatchStatus::Starting,
               exit_status: ExitStatus::executing(),
               read_count: 0,
               write_count: 0,
               filter_count: 0,
               commit_count: 0,
               rollback_count: 0,
               start_time: None,
               end_time: None,
               last_updated: None,
               terminate_only: false,
               failures: Vec::new(),
               execution_context: ExecutionContext::new() }
    }

    /// Crea una contribución nueva para el próximo chunk.
    pub fn create_contribution(&self) -> StepContribution {
        StepContribution::new(self.id)
    }

    /// Aplica (consume) la contribución de un chunk.
    pub fn apply(&mut self, contribution: StepContribution) {
        self.read_count += contribution.read_count();
        self.write_count += contribution.write_count();
        self.filter_count += contribution.filter_count();
        self.exit_status = self.exit_status.clone().and(contribution.exit_status().clone());
        self.last_updated = Some(Utc::now());
    }

    pub fn increment_commit_count(&mut self) {
        self.commit_count += 1;
    }

    pub fn increment_rollback_count(&mut self) {
        self.rollback_count += 1;
    }

    pub fn mark_started(&mut self) {
        let now = Utc::now();
        self.status = BatchStatus::Started;
        self.start_time = Some(now);
        self.last_updated = Some(now);
    }

    pub fn mark_ended(&mut self) {
        let now = Utc::now();
        self.end_time = Some(now);
        self.last_updated = Some(now);
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn set_status(&mut self, status: BatchStatus) {
        self.status = status;
    }

    pub fn exit_status(&self) -> &ExitStatus {
        &self.exit_status
    }

    pub fn set_exit_status(&mut self, exit_status: ExitStatus) {
        self.exit_status = exit_status;
    }

    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    pub fn filter_count(&self) -> u64 {
        self.filter_count
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    pub fn rollback_count(&self) -> u64 {
        self.rollback_count
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Solicita detener el step en el próximo límite de chunk.
    pub fn set_terminate_only(&mut self) {
        self.terminate_only = true;
    }

    pub fn is_terminate_only(&self) -> bool {
        self.terminate_only
    }

    pub fn add_failure(&mut self, description: impl Into<String>) {
        self.failures.push(description.into());
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn execution_context(&self) -> &ExecutionContext {
        &self.execution_context
    }

    pub fn execution_context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.execution_context
    }

    pub fn set_execution_context(&mut self, execution_context: ExecutionContext) {
        self.execution_context = execution_context;
    }

    /// Reconstruye contadores y estado a partir de una fila persistida.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(id: Uuid,
                   job_execution_id: Uuid,
                   step_name: String,
                   status: BatchStatus,
                   exit_status: ExitStatus,
                   counts: StepCounts,
                   start_time: Option<DateTime<Utc>>,
                   end_time: Option<DateTime<Utc>>,
                   last_updated: Option<DateTime<Utc>>)
                   -> Self {
        let mut se = Self::with_id(id, step_name, job_execution_id);
        se.status = status;
        se.exit_status = exit_status;
        se.read_count = counts.read;
        se.write_count = counts.write;
        se.filter_count = counts.filter;
        se.commit_count = counts.commit;
        se.rollback_count = counts.rollback;
        se.start_time = start_time;
        se.end_time = end_time;
        se.last_updated = last_updated;
        se
    }

    pub fn counts(&self) -> StepCounts {
        StepCounts { read: self.read_count,
                     write: self.write_count,
                     filter: self.filter_count,
                     commit: self.commit_count,
                     rollback: self.rollback_count }
    }
}

/// Instantánea de los contadores de un step (útil para mapear a filas).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    pub read: u64,
    pub write: u64,
    pub filter: u64,
    pub commit: u64,
    pub rollback: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExitCode;

    #[test]
    fn apply_adds_counts_and_merges_exit_status() {
        let mut se = StepExecution::new("step", Uuid::new_v4());
        let mut c = se.create_contribution();
        c.increment_read_count();
        c.increment_read_count();
        c.increment_filter_count(1);
        c.increment_write_count(1);
        se.apply(c);

        let mut failed = se.create_contribution();
        failed.increment_read_count();
        failed.set_exit_status(ExitStatus::failed().with_description("boom"));
        se.apply(failed);

        assert_eq!(se.read_count(), 3);
        assert_eq!(se.write_count(), 1);
        assert_eq!(se.filter_count(), 1);
        assert_eq!(se.exit_status().code, ExitCode::Failed);
        assert!(se.last_updated().is_some());
    }

    #[test]
    fn contribution_is_bound_to_its_step_execution() {
        let se = StepExecution::new("step", Uuid::new_v4());
        assert_eq!(se.create_contribution().step_execution_id(), se.id);
    }

    #[test]
    fn restore_round_trips_counts() {
        let counts = StepCounts { read: 6, write: 5, filter: 1, commit: 3, rollback: 0 };
        let se = StepExecution::restore(Uuid::new_v4(),
                                        Uuid::new_v4(),
                                        "people".into(),
                                        BatchStatus::Completed,
                                        ExitStatus::completed(),
                                        counts,
                                        None,
                                        None,
                                        None);
        assert_eq!(se.counts(), counts);
        assert_eq!(se.status(), BatchStatus::Completed);
    }

    #[test]
    fn batch_status_text_is_stable() {
        assert_eq!(BatchStatus::parse(BatchStatus::Stopped.as_str()), BatchStatus::Stopped);
        assert!(BatchStatus::Failed.is_unsuccessful());
        assert!(!BatchStatus::Completed.is_unsuccessful());
    }
}
