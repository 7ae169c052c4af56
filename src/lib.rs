//! chunkflow
//!
//! Fachada del workspace:
//! - Re-exporta la API de `chunk-core` (steps, listeners, modelo, stores).
//! - Expone `config` (parámetros de ejecución desde entorno) y `errors`
//!   (`AppError` para el binario y clientes).

pub mod config;
pub mod errors;

pub use chunk_adapters as adapters;
pub use chunk_core::*;
pub use chunk_persistence as persistence;
pub use config::{ExecutionMode, RunConfig};
pub use errors::AppError;
