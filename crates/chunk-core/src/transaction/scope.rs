use std::time::{Duration, Instant};

use log::{debug, error, warn};

use super::{bind, TransactionAttributes, TransactionId, TransactionManager};
use crate::errors::BatchError;

/// Guard transaccional de un chunk.
///
/// Contrato:
/// - `commit` confirma salvo que el scope esté marcado rollback-only o haya
///   excedido su timeout; en esos casos revierte y devuelve error.
/// - `rollback` revierte explícitamente.
/// - Si el scope se descarta sin cerrarse (error con `?`, panic), revierte.
pub struct TransactionScope<'a> {
    manager: &'a dyn TransactionManager,
    id: TransactionId,
    rollback_only: bool,
    finished: bool,
    started: Instant,
    timeout: Option<Duration>,
    previous: Option<TransactionId>,
}

impl<'a> TransactionScope<'a> {
    pub fn begin(manager: &'a dyn TransactionManager, attributes: &TransactionAttributes) -> Result<Self, BatchError> {
        let id = manager.begin(attributes)?;
        let previous = bind(Some(id));
        debug!("transaction {id} started");
        Ok(Self { manager,
                  id,
                  rollback_only: false,
                  finished: false,
                  started: Instant::now(),
                  timeout: attributes.timeout,
                  previous })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn set_rollback_only(&mut self) {
        self.rollback_only = true;
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    pub fn commit(mut self) -> Result<(), BatchError> {
        if self.rollback_only {
            self.finish_rollback()?;
            return Err(BatchError::Transaction(format!("transaction {} marked rollback-only", self.id)));
        }
        if let Some(timeout) = self.timeout {
            if self.started.elapsed() > timeout {
                self.finish_rollback()?;
                return Err(BatchError::Transaction(format!("transaction {} timed out after {timeout:?}", self.id)));
            }
        }
        self.release();
        self.manager.commit(self.id)?;
        debug!("transaction {} committed", self.id);
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), BatchError> {
        self.finish_rollback()
    }

    fn finish_rollback(&mut self) -> Result<(), BatchError> {
        self.release();
        self.manager.rollback(self.id)?;
        debug!("transaction {} rolled back", self.id);
        Ok(())
    }

    /// Marca el scope como cerrado y restaura la asociación previa del hilo.
    fn release(&mut self) {
        self.finished = true;
        bind(self.previous.take());
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("transaction {} dropped without commit; rolling back", self.id);
        if let Err(e) = self.finish_rollback() {
            error!("rollback of transaction {} failed: {e}", self.id);
        }
    }
}
