use chunk_core::BatchError;
use chunk_persistence::PersistenceError;
use thiserror::Error;

/// Error de aplicación: agrupa fallos del motor, de persistencia y de
/// configuración.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de ejecución: {0}")]
    Batch(#[from] BatchError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error de configuración: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_errors_keep_their_message() {
        let err: AppError = BatchError::chunk_failed(BatchError::Write("disk full".into())).into();
        assert_eq!(err.to_string(),
                   "Error de ejecución: Unable to process chunk: item write failed: disk full");
    }

    #[test]
    fn persistence_errors_are_wrapped() {
        let err: AppError = PersistenceError::NotFound.into();
        assert_eq!(err.to_string(), "Error de persistencia: not found");
    }

    #[test]
    fn config_variant_format() {
        let err = AppError::Config("CHUNKFLOW_MODE".into());
        assert_eq!(err.to_string(), "Error de configuración: CHUNKFLOW_MODE");
    }
}
