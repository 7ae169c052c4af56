//! Política de interrupción cooperativa, consultada en cada límite de chunk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::BatchError;
use crate::model::StepExecution;

pub trait InterruptionPolicy: Send + Sync {
    /// Devuelve `Err(BatchError::Interrupted)` si se solicitó detener el step.
    fn check_interrupted(&self, step_execution: &StepExecution) -> Result<(), BatchError>;
}

/// Política por defecto: un flag compartido más `terminate_only` del step.
#[derive(Debug, Clone, Default)]
pub struct FlagInterruptionPolicy {
    flag: Arc<AtomicBool>,
}

impl FlagInterruptionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle para solicitar la interrupción desde otro hilo.
    pub fn handle(&self) -> InterruptHandle {
        InterruptHandle { flag: Arc::clone(&self.flag) }
    }
}

impl InterruptionPolicy for FlagInterruptionPolicy {
    fn check_interrupted(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(BatchError::Interrupted(format!("interrupt requested for step '{}'", step_execution.step_name)));
        }
        if step_execution.is_terminate_only() {
            return Err(BatchError::Interrupted(format!("step '{}' marked terminate-only", step_execution.step_name)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Nunca interrumpe.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverInterrupt;

impl InterruptionPolicy for NeverInterrupt {
    fn check_interrupted(&self, _step_execution: &StepExecution) -> Result<(), BatchError> {
        Ok(())
    }
}
