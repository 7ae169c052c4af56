//! Componentes de un step orientado a chunks.
//!
//! - `ChunkReader` / `ChunkTransformer` / `ChunkWriter`: las tres fases de
//!   un chunk, con sus listeners.
//! - `ChunkOrientedStep`: orquestador secuencial y transaccional.
//! - `ConcurrentChunkOrientedStep`: lectura secuencial + pool de workers.
//! - `StepHarness`: ciclo de vida común (streams, estado final, persistencia).
//! - `StepBuilder`: construcción y validación.

pub mod builder;
pub mod concurrent;
pub mod config;
pub mod harness;
pub mod reader;
pub mod sequential;
pub mod transformer;
pub mod writer;

pub use builder::StepBuilder;
pub use concurrent::{ChunkWorker, ConcurrentChunkOrientedStep};
pub use config::StepConfig;
pub use harness::{ChunkStrategy, StepHarness};
pub use reader::ChunkReader;
pub use sequential::ChunkOrientedStep;
pub use transformer::ChunkTransformer;
pub use writer::ChunkWriter;
