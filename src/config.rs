//! Configuración de ejecución del binario.
//!
//! Variables (todas opcionales, `.env` se carga una sola vez):
//! - `CHUNKFLOW_CHUNK_SIZE` (10)
//! - `CHUNKFLOW_WORKERS` (1; sólo modo concurrente)
//! - `CHUNKFLOW_MODE`: `sequential` | `concurrent` (`sequential`)
//! - `CHUNKFLOW_TX_TIMEOUT_SECS`: timeout de la transacción de cada chunk

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chunk_core::{StepConfig, TransactionAttributes};
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

impl FromStr for ExecutionMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" => Ok(ExecutionMode::Concurrent),
            other => Err(AppError::Config(format!("CHUNKFLOW_MODE desconocido: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub chunk_size: usize,
    pub workers: usize,
    pub mode: ExecutionMode,
    pub tx_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { chunk_size: 10,
               workers: 1,
               mode: ExecutionMode::Sequential,
               tx_timeout: None }
    }
}

impl RunConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una función de búsqueda inyectable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let defaults = Self::default();
        let chunk_size = parse_var(&lookup, "CHUNKFLOW_CHUNK_SIZE")?.unwrap_or(defaults.chunk_size);
        let workers = parse_var(&lookup, "CHUNKFLOW_WORKERS")?.unwrap_or(defaults.workers);
        let mode = parse_var(&lookup, "CHUNKFLOW_MODE")?.unwrap_or(defaults.mode);
        let tx_timeout = parse_var::<u64, _>(&lookup, "CHUNKFLOW_TX_TIMEOUT_SECS")?.map(Duration::from_secs);
        Ok(Self { chunk_size,
                  workers,
                  mode,
                  tx_timeout })
    }

    /// Configuración de step equivalente (se valida al construir el step).
    pub fn step_config(&self, name: impl Into<String>) -> StepConfig {
        let mut transaction = TransactionAttributes::default();
        if let Some(timeout) = self.tx_timeout {
            transaction = transaction.with_timeout(timeout);
        }
        StepConfig::new(name, self.chunk_size).with_workers(self.workers)
                                              .with_transaction(transaction)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
    where T: FromStr,
          T::Err: std::fmt::Display,
          F: Fn(&str) -> Option<String>
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim()
                        .parse()
                        .map(Some)
                        .map_err(|e| AppError::Config(format!("{key}={raw}: {e}"))),
    }
}
