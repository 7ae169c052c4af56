//! chunk-adapters: colaboradores de referencia para `chunk-core`.
//!
//! - Lectores en memoria (`ListItemReader` reiniciable, `IteratorItemReader`)
//!   y el lector compuesto `CompositeItemReader`.
//! - Procesadores `PassThroughProcessor` y `processor_fn`.
//! - `TransactionalListWriter`: destino que publica sólo al confirmar.
//! - Listeners de log y de captura de eventos.

pub mod composite;
pub mod listeners;
pub mod processors;
pub mod readers;
pub mod writers;

pub use composite::CompositeItemReader;
pub use listeners::{CollectingListener, LoggingListener};
pub use processors::{processor_fn, FnProcessor, PassThroughProcessor};
pub use readers::{IteratorItemReader, ListItemReader};
pub use writers::TransactionalListWriter;
