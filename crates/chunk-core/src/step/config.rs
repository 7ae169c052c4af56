use serde::{Deserialize, Serialize};

use crate::errors::BatchError;
use crate::transaction::TransactionAttributes;

/// Configuración inmutable de un step durante la ejecución.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    pub chunk_size: usize,
    /// Sólo se usa en modo concurrente.
    pub worker_pool_size: usize,
    #[serde(default)]
    pub transaction: TransactionAttributes,
}

impl StepConfig {
    pub fn new(name: impl Into<String>, chunk_size: usize) -> Self {
        Self { name: name.into(),
               chunk_size,
               worker_pool_size: 1,
               transaction: TransactionAttributes::default() }
    }

    pub fn with_workers(mut self, worker_pool_size: usize) -> Self {
        self.worker_pool_size = worker_pool_size;
        self
    }

    pub fn with_transaction(mut self, transaction: TransactionAttributes) -> Self {
        self.transaction = transaction;
        self
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.name.trim().is_empty() {
            return Err(BatchError::Config("step name must not be empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(BatchError::Config(format!("chunk size of step '{}' must be greater than 0", self.name)));
        }
        if self.worker_pool_size == 0 {
            return Err(BatchError::Config(format!("worker pool size of step '{}' must be greater than 0", self.name)));
        }
        Ok(())
    }
}
