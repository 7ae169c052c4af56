//! Builder de steps orientados a chunks.
//!
//! Reúne lector, procesador, escritor, listeners, política de interrupción,
//! gestor de transacciones y streams adicionales, valida la configuración y
//! produce un `ChunkOrientedStep` (secuencial) o un
//! `ConcurrentChunkOrientedStep` (pool de workers).
//!
//! ```ignore
//! let step = StepBuilder::new(StepConfig::new("people", 2), reader, processor, writer)
//!     .transaction_manager(tm)
//!     .chunk_listener(listener)
//!     .build()?;
//! ```

use std::sync::Arc;

use rayon::ThreadPoolBuilder;

use super::concurrent::{ChunkWorker, ConcurrentChunkOrientedStep};
use super::config::StepConfig;
use super::sequential::ChunkOrientedStep;
use super::{ChunkReader, ChunkTransformer, ChunkWriter};
use crate::errors::BatchError;
use crate::interruption::{FlagInterruptionPolicy, InterruptionPolicy};
use crate::item::{ItemProcessor, ItemReader, ItemStream, ItemWriter, StreamRegistry};
use crate::listener::{ChunkListener, ChunkListeners, ItemProcessListener, ItemReadListener, ItemWriteListener, ListenerChain,
                      ProcessListeners, ReadListeners, WriteListeners};
use crate::transaction::{ResourceTransactionManager, TransactionManager};

pub struct StepBuilder<I, O> {
    config: StepConfig,
    reader: Box<dyn ItemReader<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
    read_listeners: ReadListeners<I>,
    process_listeners: ProcessListeners<I, O>,
    write_listeners: WriteListeners<O>,
    chunk_listeners: ChunkListeners<I, O>,
    interruption: Option<Arc<dyn InterruptionPolicy>>,
    transaction_manager: Option<Arc<dyn TransactionManager>>,
    extra_streams: Vec<Arc<dyn ItemStream>>,
}

impl<I: 'static, O: 'static> StepBuilder<I, O> {
    pub fn new(config: StepConfig,
               reader: Box<dyn ItemReader<I>>,
               processor: Arc<dyn ItemProcessor<I, O>>,
               writer: Arc<dyn ItemWriter<O>>)
               -> Self {
        Self { config,
               reader,
               processor,
               writer,
               read_listeners: ListenerChain::new(),
               process_listeners: ListenerChain::new(),
               write_listeners: ListenerChain::new(),
               chunk_listeners: ListenerChain::new(),
               interruption: None,
               transaction_manager: None,
               extra_streams: Vec::new() }
    }

    pub fn read_listener(mut self, listener: Arc<dyn ItemReadListener<I>>) -> Self {
        self.read_listeners.register(listener);
        self
    }

    pub fn process_listener(mut self, listener: Arc<dyn ItemProcessListener<I, O>>) -> Self {
        self.process_listeners.register(listener);
        self
    }

    pub fn write_listener(mut self, listener: Arc<dyn ItemWriteListener<O>>) -> Self {
        self.write_listeners.register(listener);
        self
    }

    pub fn chunk_listener(mut self, listener: Arc<dyn ChunkListener<I, O>>) -> Self {
        self.chunk_listeners.register(listener);
        self
    }

    /// Registra un listener que implementa los cuatro tipos de hooks.
    pub fn listener<L>(self, listener: Arc<L>) -> Self
        where L: ItemReadListener<I> + ItemProcessListener<I, O> + ItemWriteListener<O> + ChunkListener<I, O> + 'static
    {
        self.read_listener(listener.clone())
            .process_listener(listener.clone())
            .write_listener(listener.clone())
            .chunk_listener(listener)
    }

    /// Por defecto se usa un `FlagInterruptionPolicy` sin handle externo.
    pub fn interruption_policy(mut self, policy: Arc<dyn InterruptionPolicy>) -> Self {
        self.interruption = Some(policy);
        self
    }

    /// Por defecto se usa un `ResourceTransactionManager` sin recursos.
    pub fn transaction_manager(mut self, transaction_manager: Arc<dyn TransactionManager>) -> Self {
        self.transaction_manager = Some(transaction_manager);
        self
    }

    /// Stream adicional (además de lector/procesador/escritor) que participa
    /// del checkpoint.
    pub fn stream(mut self, stream: Arc<dyn ItemStream>) -> Self {
        self.extra_streams.push(stream);
        self
    }

    fn into_parts(self) -> Result<Parts<I, O>, BatchError> {
        self.config.validate()?;
        let mut streams = StreamRegistry::detect(self.reader.as_ref(), self.processor.as_ref(), self.writer.as_ref());
        for stream in self.extra_streams {
            streams.register(stream);
        }
        let reader = ChunkReader::new(self.reader, self.config.chunk_size, self.read_listeners);
        let transformer = ChunkTransformer::new(self.processor, Arc::new(self.process_listeners));
        let writer = ChunkWriter::new(self.writer, Arc::new(self.write_listeners));
        let interruption: Arc<dyn InterruptionPolicy> = match self.interruption {
            Some(policy) => policy,
            None => Arc::new(FlagInterruptionPolicy::new()),
        };
        let transaction_manager: Arc<dyn TransactionManager> = match self.transaction_manager {
            Some(manager) => manager,
            None => Arc::new(ResourceTransactionManager::new()),
        };
        Ok(Parts { config: self.config,
                   reader,
                   transformer,
                   writer,
                   chunk_listeners: Arc::new(self.chunk_listeners),
                   interruption,
                   transaction_manager,
                   streams })
    }

    pub fn build(self) -> Result<ChunkOrientedStep<I, O>, BatchError> {
        let parts = self.into_parts()?;
        Ok(ChunkOrientedStep { config: parts.config,
                               reader: parts.reader,
                               transformer: parts.transformer,
                               writer: parts.writer,
                               chunk_listeners: parts.chunk_listeners,
                               interruption: parts.interruption,
                               transaction_manager: parts.transaction_manager,
                               streams: parts.streams })
    }

    pub fn build_concurrent(self) -> Result<ConcurrentChunkOrientedStep<I, O>, BatchError>
        where I: Send,
              O: Send
    {
        let parts = self.into_parts()?;
        let pool = ThreadPoolBuilder::new().num_threads(parts.config.worker_pool_size)
                                           .thread_name(|i| format!("chunk-worker-{i}"))
                                           .build()
                                           .map_err(|e| BatchError::Config(format!("unable to build worker pool: {e}")))?;
        let worker = ChunkWorker::new(parts.transformer,
                                      parts.writer,
                                      parts.chunk_listeners,
                                      parts.transaction_manager,
                                      parts.config.transaction.clone());
        Ok(ConcurrentChunkOrientedStep { config: parts.config,
                                         reader: parts.reader,
                                         worker: Arc::new(worker),
                                         interruption: parts.interruption,
                                         streams: parts.streams,
                                         pool: Arc::new(pool) })
    }
}

struct Parts<I, O> {
    config: StepConfig,
    reader: ChunkReader<I>,
    transformer: ChunkTransformer<I, O>,
    writer: ChunkWriter<O>,
    chunk_listeners: Arc<ChunkListeners<I, O>>,
    interruption: Arc<dyn InterruptionPolicy>,
    transaction_manager: Arc<dyn TransactionManager>,
    streams: StreamRegistry,
}
