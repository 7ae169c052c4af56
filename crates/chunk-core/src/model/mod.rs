//! Modelo de estado de ejecución (contribuciones, step, contexto, salida).

pub mod context;
pub mod contribution;
pub mod execution;
pub mod exit_status;

pub use context::ExecutionContext;
pub use contribution::StepContribution;
pub use execution::{BatchStatus, StepCounts, StepExecution};
pub use exit_status::{ExitCode, ExitStatus};
