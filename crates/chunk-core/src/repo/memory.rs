use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::warn;
use uuid::Uuid;

use super::ExecutionMetadataStore;
use crate::errors::BatchError;
use crate::model::{ExecutionContext, StepExecution};

struct JobDocument {
    job_name: String,
    execution_context: ExecutionContext,
}

/// Implementación en memoria; útil para tests y para el binario demo sin
/// base de datos.
///
/// Igual que el almacén Postgres, una actualización sobre un documento
/// inexistente no crea nada.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    jobs: DashMap<Uuid, JobDocument>,
    steps: DashMap<Uuid, StepExecution>,
    step_updates: AtomicU64,
    context_updates: AtomicU64,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_name(&self, job_execution_id: Uuid) -> Option<String> {
        self.jobs.get(&job_execution_id).map(|job| job.job_name.clone())
    }

    /// Número de `update_step_execution` aplicados.
    pub fn step_update_count(&self) -> u64 {
        self.step_updates.load(Ordering::SeqCst)
    }

    /// Número de `update_step_execution_context` aplicados.
    pub fn context_update_count(&self) -> u64 {
        self.context_updates.load(Ordering::SeqCst)
    }
}

impl ExecutionMetadataStore for InMemoryExecutionStore {
    fn create_job_execution(&self, job_execution_id: Uuid, job_name: &str) -> Result<(), BatchError> {
        self.jobs
            .entry(job_execution_id)
            .or_insert_with(|| JobDocument { job_name: job_name.to_string(),
                                             execution_context: ExecutionContext::new() });
        Ok(())
    }

    fn save_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        self.steps.insert(step_execution.id, step_execution.clone());
        Ok(())
    }

    fn update_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        match self.steps.get_mut(&step_execution.id) {
            Some(mut stored) => {
                // el contexto se actualiza por separado
                let context = stored.execution_context().clone();
                *stored = step_execution.clone();
                stored.set_execution_context(context);
                self.step_updates.fetch_add(1, Ordering::SeqCst);
            }
            None => warn!("update of unknown step execution {} ignored", step_execution.id),
        }
        Ok(())
    }

    fn get_step_execution(&self, step_execution_id: Uuid) -> Result<Option<StepExecution>, BatchError> {
        Ok(self.steps.get(&step_execution_id).map(|se| se.clone()))
    }

    fn update_step_execution_context(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        match self.steps.get_mut(&step_execution.id) {
            Some(mut stored) => {
                stored.set_execution_context(step_execution.execution_context().clone());
                self.context_updates.fetch_add(1, Ordering::SeqCst);
            }
            None => warn!("context update of unknown step execution {} ignored", step_execution.id),
        }
        Ok(())
    }

    fn update_job_execution_context(&self,
                                    job_execution_id: Uuid,
                                    execution_context: &ExecutionContext)
                                    -> Result<(), BatchError> {
        match self.jobs.get_mut(&job_execution_id) {
            Some(mut job) => job.execution_context = execution_context.clone(),
            None => warn!("context update of unknown job execution {job_execution_id} ignored"),
        }
        Ok(())
    }

    fn get_step_execution_context(&self, step_execution_id: Uuid) -> Result<ExecutionContext, BatchError> {
        Ok(self.steps
               .get(&step_execution_id)
               .map(|se| se.execution_context().clone())
               .unwrap_or_default())
    }

    fn get_job_execution_context(&self, job_execution_id: Uuid) -> Result<ExecutionContext, BatchError> {
        Ok(self.jobs
               .get(&job_execution_id)
               .map(|job| job.execution_context.clone())
               .unwrap_or_default())
    }
}
