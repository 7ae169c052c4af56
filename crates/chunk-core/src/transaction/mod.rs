//! Límite transaccional de un chunk.
//!
//! - `TransactionManager`: backend pluggable (begin/commit/rollback).
//! - `TransactionScope`: guard adquirido por chunk; garantiza commit o
//!   rollback en toda salida (incluidos errores y panics).
//! - `ResourceTransactionManager`: implementación de referencia que reparte
//!   commit/rollback entre recursos transaccionales registrados.
//!
//! La transacción activa se asocia al hilo actual mientras el scope vive, de
//! modo que un destino transaccional puede preparar su escritura contra ella
//! (`current_transaction`). Cada worker del modo concurrente tiene su propio
//! scope en su propio hilo.

mod resource;
mod scope;

use std::cell::Cell;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::BatchError;

pub use resource::{ResourceTransactionManager, TransactionalResource};
pub use scope::TransactionScope;

/// Identificador opaco de una transacción.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    #[default]
    Required,
    RequiresNew,
    Supports,
    NotSupported,
    Mandatory,
    Never,
    Nested,
}

/// Atributos fijados al construir el step; inmutables durante la ejecución.
///
/// Toda falla durante el chunk provoca rollback (no hay reglas de excepción).
/// `timeout` lo aplica `TransactionScope`; aislamiento, propagación y
/// `read_only` se pasan tal cual al `TransactionManager`, que decide si los
/// soporta (`ResourceTransactionManager` sólo los registra en el log).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionAttributes {
    #[serde(default)]
    pub isolation: Isolation,
    #[serde(default)]
    pub propagation: Propagation,
    /// Tiempo máximo entre `begin` y `commit`.
    #[serde(default)]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub read_only: bool,
}

impl TransactionAttributes {
    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub trait TransactionManager: Send + Sync {
    fn begin(&self, attributes: &TransactionAttributes) -> Result<TransactionId, BatchError>;
    fn commit(&self, tx: TransactionId) -> Result<(), BatchError>;
    fn rollback(&self, tx: TransactionId) -> Result<(), BatchError>;
}

thread_local! {
    static CURRENT_TX: Cell<Option<TransactionId>> = const { Cell::new(None) };
}

/// Transacción asociada al hilo actual, si hay un scope activo.
pub fn current_transaction() -> Option<TransactionId> {
    CURRENT_TX.with(Cell::get)
}

/// Asocia `tx` al hilo y devuelve la asociación anterior.
fn bind(tx: Option<TransactionId>) -> Option<TransactionId> {
    CURRENT_TX.with(|c| c.replace(tx))
}
