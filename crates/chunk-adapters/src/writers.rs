use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chunk_core::{current_transaction, BatchError, Chunk, ItemWriter, TransactionId, TransactionalResource};
use dashmap::DashMap;
use log::debug;

/// Destino en memoria que participa de la transacción del chunk.
///
/// Dentro de un scope transaccional las escrituras quedan preparadas contra
/// la transacción del hilo y sólo se publican en `commit`; un `rollback`
/// las descarta. Fuera de un scope se publican de inmediato.
///
/// Para recibir commits/rollbacks debe registrarse como recurso del
/// `ResourceTransactionManager` del step.
pub struct TransactionalListWriter<T> {
    staged: DashMap<TransactionId, Vec<T>>,
    committed: Mutex<Vec<T>>,
    writes: AtomicUsize,
}

impl<T> Default for TransactionalListWriter<T> {
    fn default() -> Self {
        Self { staged: DashMap::new(),
               committed: Mutex::new(Vec::new()),
               writes: AtomicUsize::new(0) }
    }
}

impl<T: Clone> TransactionalListWriter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items visibles (confirmados), en orden de commit.
    pub fn items(&self) -> Vec<T> {
        self.committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.committed.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Número de llamadas a `write` (incluidas las revertidas).
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Transacciones con escrituras pendientes.
    pub fn pending_transactions(&self) -> usize {
        self.staged.len()
    }

    fn publish(&self, items: Vec<T>) -> Result<(), BatchError> {
        self.committed
            .lock()
            .map_err(|_| BatchError::Write("committed item list poisoned".into()))?
            .extend(items);
        Ok(())
    }
}

impl<T: Clone + Send + Sync> ItemWriter<T> for TransactionalListWriter<T> {
    fn write(&self, chunk: &Chunk<T>) -> Result<(), BatchError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        match current_transaction() {
            Some(tx) => {
                self.staged.entry(tx).or_default().extend(chunk.iter().cloned());
                Ok(())
            }
            None => self.publish(chunk.iter().cloned().collect()),
        }
    }
}

impl<T: Clone + Send + Sync> TransactionalResource for TransactionalListWriter<T> {
    fn commit(&self, tx: TransactionId) -> Result<(), BatchError> {
        if let Some((_, items)) = self.staged.remove(&tx) {
            debug!("publishing {} item(s) for {tx}", items.len());
            self.publish(items)?;
        }
        Ok(())
    }

    fn rollback(&self, tx: TransactionId) -> Result<(), BatchError> {
        if let Some((_, items)) = self.staged.remove(&tx) {
            debug!("discarding {} item(s) for {tx}", items.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chunk_core::{ResourceTransactionManager, TransactionAttributes, TransactionScope};

    use super::*;

    #[test]
    fn staged_items_become_visible_on_commit_only() {
        let writer = Arc::new(TransactionalListWriter::<u32>::new());
        let tm = ResourceTransactionManager::new().with_resource(writer.clone());

        let scope = TransactionScope::begin(&tm, &TransactionAttributes::default()).unwrap();
        writer.write(&vec![1, 2].into()).unwrap();
        assert!(writer.is_empty());
        assert_eq!(writer.pending_transactions(), 1);
        scope.commit().unwrap();
        assert_eq!(writer.items(), vec![1, 2]);

        let scope = TransactionScope::begin(&tm, &TransactionAttributes::default()).unwrap();
        writer.write(&vec![3].into()).unwrap();
        scope.rollback().unwrap();
        assert_eq!(writer.items(), vec![1, 2]);
        assert_eq!(writer.pending_transactions(), 0);
        assert_eq!(writer.write_calls(), 2);
    }

    #[test]
    fn writes_outside_a_transaction_are_immediate() {
        let writer = TransactionalListWriter::<&str>::new();
        writer.write(&vec!["a"].into()).unwrap();
        assert_eq!(writer.items(), vec!["a"]);
    }
}
