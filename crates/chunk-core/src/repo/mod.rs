//! Almacén de metadatos de ejecución (estado de steps y checkpoints).
//!
//! El orquestador lo invoca tras cada commit de chunk para persistir el
//! `StepExecution` y su `ExecutionContext`. Las escrituras de contexto son
//! actualizaciones puntuales por id de ejecución; leer un contexto que no
//! existe devuelve un contexto vacío.

mod memory;

use uuid::Uuid;

use crate::errors::BatchError;
use crate::model::{ExecutionContext, StepExecution};

pub use memory::InMemoryExecutionStore;

pub trait ExecutionMetadataStore: Send + Sync {
    /// Registra una ejecución de job (contenedor de sus steps).
    fn create_job_execution(&self, job_execution_id: Uuid, job_name: &str) -> Result<(), BatchError>;

    /// Inserta (o reemplaza) la fila de un step.
    fn save_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError>;

    /// Actualiza estado y contadores de un step ya guardado.
    fn update_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError>;

    fn get_step_execution(&self, step_execution_id: Uuid) -> Result<Option<StepExecution>, BatchError>;

    /// Persiste el contexto del step (sólo esa columna/campo).
    fn update_step_execution_context(&self, step_execution: &StepExecution) -> Result<(), BatchError>;

    fn update_job_execution_context(&self,
                                    job_execution_id: Uuid,
                                    execution_context: &ExecutionContext)
                                    -> Result<(), BatchError>;

    fn get_step_execution_context(&self, step_execution_id: Uuid) -> Result<ExecutionContext, BatchError>;

    fn get_job_execution_context(&self, job_execution_id: Uuid) -> Result<ExecutionContext, BatchError>;
}
