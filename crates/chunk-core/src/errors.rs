//! Errores del núcleo de procesamiento por chunks.
//!
//! Todas las fases de un chunk (lectura, proceso, escritura, listeners)
//! propagan `BatchError`. El orquestador envuelve cualquier fallo de fase en
//! `ChunkFailed` antes de terminar el step.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum BatchError {
    #[error("item read failed: {0}")] Read(String),
    #[error("item process failed: {0}")] Process(String),
    #[error("item write failed: {0}")] Write(String),
    #[error("listener failed: {0}")] Listener(String),
    #[error("step interrupted: {0}")] Interrupted(String),
    #[error("transaction error: {0}")] Transaction(String),
    #[error("item stream error: {0}")] Stream(String),
    #[error("execution metadata store error: {0}")] Repository(String),
    #[error("invalid configuration: {0}")] Config(String),
    #[error("worker failed: {0}")] Worker(String),
    #[error("Unable to process chunk: {source}")] ChunkFailed { source: Box<BatchError> },
}

impl BatchError {
    /// Envuelve un fallo de fase como fallo fatal del chunk.
    pub fn chunk_failed(cause: BatchError) -> Self {
        Self::ChunkFailed { source: Box::new(cause) }
    }

    /// `true` si el error (o su causa) es una solicitud de interrupción.
    pub fn is_interrupted(&self) -> bool {
        matches!(self.root_cause(), BatchError::Interrupted(_))
    }

    /// Recorre la cadena de `ChunkFailed` hasta la causa original.
    pub fn root_cause(&self) -> &BatchError {
        let mut current = self;
        while let BatchError::ChunkFailed { source } = current {
            current = source;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_failed_message_names_the_cause() {
        let err = BatchError::chunk_failed(BatchError::Process("Unable to process item 3".into()));
        assert_eq!(err.to_string(), "Unable to process chunk: item process failed: Unable to process item 3");
    }

    #[test]
    fn root_cause_unwraps_nested_chunk_failures() {
        let err = BatchError::chunk_failed(BatchError::chunk_failed(BatchError::Write("disk full".into())));
        assert_eq!(err.root_cause(), &BatchError::Write("disk full".into()));
    }

    #[test]
    fn interruption_is_detected_through_wrapping() {
        let err = BatchError::chunk_failed(BatchError::Interrupted("stop requested".into()));
        assert!(err.is_interrupted());
        assert!(!BatchError::Read("eof".into()).is_interrupted());
    }
}
