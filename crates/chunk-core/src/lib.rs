//! chunk-core: motor de procesamiento por chunks (leer → procesar → escribir)
//! con commit/rollback por chunk y modo concurrente opcional.
pub mod chunk;
pub mod errors;
pub mod interruption;
pub mod item;
pub mod listener;
pub mod model;
pub mod repo;
pub mod step;
pub mod transaction;

pub use chunk::{Chunk, ChunkRead, ReadState};
pub use errors::BatchError;
pub use interruption::{FlagInterruptionPolicy, InterruptHandle, InterruptionPolicy, NeverInterrupt};
pub use item::{CompositeItemStream, ItemProcessor, ItemReader, ItemStream, ItemWriter, StreamRegistry};
pub use listener::{ChunkListener, ItemProcessListener, ItemReadListener, ItemWriteListener, ListenerChain};
pub use model::{BatchStatus, ExecutionContext, ExitCode, ExitStatus, StepContribution, StepCounts, StepExecution};
pub use repo::{ExecutionMetadataStore, InMemoryExecutionStore};
pub use step::{ChunkOrientedStep, ChunkStrategy, ConcurrentChunkOrientedStep, StepBuilder, StepConfig, StepHarness};
pub use transaction::{current_transaction, ResourceTransactionManager, TransactionAttributes, TransactionId,
                      TransactionManager, TransactionScope, TransactionalResource};
