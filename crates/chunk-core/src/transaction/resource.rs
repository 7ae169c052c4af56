use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use log::{debug, error};

use super::{TransactionAttributes, TransactionId, TransactionManager};
use crate::errors::BatchError;

/// Recurso que participa de la transacción de un chunk (p.ej. un destino
/// que prepara filas y las publica al confirmar).
pub trait TransactionalResource: Send + Sync {
    fn commit(&self, tx: TransactionId) -> Result<(), BatchError>;
    fn rollback(&self, tx: TransactionId) -> Result<(), BatchError>;
}

/// Gestor de transacciones de referencia.
///
/// - Los recursos se registran al construir y no cambian durante la ejecución.
/// - Si un recurso falla al confirmar, el resto se revierte y se devuelve el
///   error.
/// - Lleva contadores de commits/rollbacks efectivos.
#[derive(Default)]
pub struct ResourceTransactionManager {
    next_id: AtomicU64,
    active: DashSet<TransactionId>,
    resources: Vec<Arc<dyn TransactionalResource>>,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl ResourceTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: Arc<dyn TransactionalResource>) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> u64 {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    fn take_active(&self, tx: TransactionId) -> Result<(), BatchError> {
        self.active
            .remove(&tx)
            .map(|_| ())
            .ok_or_else(|| BatchError::Transaction(format!("{tx} is not active")))
    }
}

impl TransactionManager for ResourceTransactionManager {
    fn begin(&self, attributes: &TransactionAttributes) -> Result<TransactionId, BatchError> {
        let tx = TransactionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.active.insert(tx);
        debug!("{tx} begun (isolation {:?}, propagation {:?}, read_only {})",
               attributes.isolation,
               attributes.propagation,
               attributes.read_only);
        Ok(tx)
    }

    fn commit(&self, tx: TransactionId) -> Result<(), BatchError> {
        self.take_active(tx)?;
        for (idx, resource) in self.resources.iter().enumerate() {
            if let Err(e) = resource.commit(tx) {
                error!("resource commit failed for {tx}: {e}; rolling back remaining resources");
                for rest in &self.resources[idx + 1..] {
                    if let Err(rb) = rest.rollback(tx) {
                        error!("resource rollback failed for {tx}: {rb}");
                    }
                }
                self.rollbacks.fetch_add(1, Ordering::SeqCst);
                return Err(e);
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self, tx: TransactionId) -> Result<(), BatchError> {
        self.take_active(tx)?;
        let mut first_error = None;
        for resource in &self.resources {
            if let Err(e) = resource.rollback(tx) {
                error!("resource rollback failed for {tx}: {e}");
                first_error.get_or_insert(e);
            }
        }
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        first_error.map_or(Ok(()), Err)
    }
}
