use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use crate::errors::BatchError;
use crate::model::{BatchStatus, ExecutionContext, ExitStatus, StepExecution};
use crate::repo::ExecutionMetadataStore;

/// Estrategia de ejecución de chunks (secuencial o concurrente) que el
/// harness envuelve con el ciclo de vida del step.
pub trait ChunkStrategy {
    fn step_name(&self) -> &str;

    /// Abre los streams con el contexto restaurado.
    fn open(&mut self, execution_context: &ExecutionContext) -> Result<(), BatchError>;

    /// Ejecuta todos los chunks. Devuelve el primer error fatal.
    fn run(&mut self, step_execution: &mut StepExecution, store: &dyn ExecutionMetadataStore) -> Result<(), BatchError>;

    fn close(&mut self) -> Result<(), BatchError>;
}

/// Ciclo de vida de un step alrededor de una `ChunkStrategy`.
///
/// 1. `Started` + hora de inicio, se guarda la fila.
/// 2. Se abren los streams con el contexto del step.
/// 3. Se ejecuta la estrategia.
/// 4. Estado final: `Completed`, `Stopped` (interrupción) o `Failed`.
/// 5. Siempre se cierran los streams y se persisten step y contexto.
pub struct StepHarness {
    store: Arc<dyn ExecutionMetadataStore>,
}

impl StepHarness {
    pub fn new(store: Arc<dyn ExecutionMetadataStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn ExecutionMetadataStore {
        self.store.as_ref()
    }

    /// Nueva ejecución del mismo step que retoma el contexto guardado de
    /// `previous_step_execution_id`.
    pub fn restart_from(&self, previous_step_execution_id: Uuid) -> Result<StepExecution, BatchError> {
        let previous = self.store
                           .get_step_execution(previous_step_execution_id)?
                           .ok_or_else(|| {
                               BatchError::Repository(format!("step execution {previous_step_execution_id} not found"))
                           })?;
        let execution_context = self.store.get_step_execution_context(previous_step_execution_id)?;
        let mut step_execution = StepExecution::new(previous.step_name.clone(), previous.job_execution_id);
        step_execution.set_execution_context(execution_context);
        info!("restarting step '{}' from execution {previous_step_execution_id}", previous.step_name);
        Ok(step_execution)
    }

    pub fn execute(&self, strategy: &mut dyn ChunkStrategy, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        step_execution.mark_started();
        self.store.save_step_execution(step_execution)?;

        let mut outcome = strategy.open(step_execution.execution_context())
                              .and_then(|()| strategy.run(step_execution, self.store.as_ref()));

        match &outcome {
            Ok(()) => {
                let exit_status = step_execution.exit_status().clone().and(ExitStatus::completed());
                let status = if exit_status.is_failed() { BatchStatus::Failed } else { BatchStatus::Completed };
                step_execution.set_status(status);
                step_execution.set_exit_status(exit_status);
            }
            Err(e) if e.is_interrupted() => {
                warn!("step '{}' stopped: {e}", strategy.step_name());
                step_execution.set_status(BatchStatus::Stopped);
                step_execution.set_exit_status(ExitStatus::stopped().with_description(e.to_string()));
            }
            Err(e) => {
                error!("step '{}' failed: {e}", strategy.step_name());
                let exit_status = step_execution.exit_status()
                                                .clone()
                                                .and(ExitStatus::failed().with_description(e.to_string()));
                step_execution.set_status(BatchStatus::Failed);
                step_execution.set_exit_status(exit_status);
                step_execution.add_failure(e.to_string());
            }
        }
        // chunks fallidos agregados por la estrategia concurrente
        if outcome.is_ok() && step_execution.status() == BatchStatus::Failed {
            outcome = Err(BatchError::Worker(step_execution.exit_status().description.clone()));
        }

        if let Err(e) = strategy.close() {
            error!("step '{}' failed to close its streams: {e}", strategy.step_name());
            step_execution.add_failure(e.to_string());
            if outcome.is_ok() {
                let exit_status = step_execution.exit_status()
                                                .clone()
                                                .and(ExitStatus::failed().with_description(e.to_string()));
                step_execution.set_status(BatchStatus::Failed);
                step_execution.set_exit_status(exit_status);
                outcome = Err(e);
            }
        }

        step_execution.mark_ended();
        self.store.update_step_execution(step_execution)?;
        self.store.update_step_execution_context(step_execution)?;
        info!("step '{}' finished with {} ({})",
              strategy.step_name(),
              step_execution.status().as_str(),
              step_execution.exit_status());
        outcome
    }
}
