use uuid::Uuid;

use super::ExitStatus;

/// Acumulador por chunk: contadores y resultado de una iteración.
///
/// Se crea al comienzo de cada chunk (`StepExecution::create_contribution`)
/// y se consume al aplicarse, por lo que nunca se reutiliza entre chunks.
#[derive(Debug, PartialEq, Eq)]
pub struct StepContribution {
    step_execution_id: Uuid,
    read_count: u64,
    write_count: u64,
    filter_count: u64,
    exit_status: ExitStatus,
}

impl StepContribution {
    pub(crate) fn new(step_execution_id: Uuid) -> Self {
        Self { step_execution_id,
               read_count: 0,
               write_count: 0,
               filter_count: 0,
               exit_status: ExitStatus::executing() }
    }

    pub fn step_execution_id(&self) -> Uuid {
        self.step_execution_id
    }

    pub fn increment_read_count(&mut self) {
        self.read_count += 1;
    }

    pub fn increment_write_count(&mut self, count: u64) {
        self.write_count += count;
    }

    pub fn increment_filter_count(&mut self, count: u64) {
        self.filter_count += count;
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

    pub fn exit_status(&self) -> &ExitStatus {
        &self.exit_status
    }

    pub fn set_exit_status(&mut self, exit_status: ExitStatus) {
        self.exit_status = exit_status;
    }

    pub fn is_failed(&self) -> bool {
        self.exit_status.is_failed()
    }
}
