use std::sync::Arc;

use log::{debug, error, info, warn};

use super::config::StepConfig;
use super::harness::ChunkStrategy;
use super::{ChunkReader, ChunkTransformer, ChunkWriter};
use crate::chunk::{Chunk, ReadState};
use crate::errors::BatchError;
use crate::interruption::InterruptionPolicy;
use crate::item::StreamRegistry;
use crate::listener::ChunkListeners;
use crate::model::{ExecutionContext, ExitStatus, StepContribution, StepExecution};
use crate::repo::ExecutionMetadataStore;
use crate::transaction::{TransactionManager, TransactionScope};

/// Orquestador secuencial: un chunk por transacción, en el hilo que llama.
///
/// Por iteración: interrupción → scope → leer → `before_chunk` → procesar →
/// escribir → aplicar contribución, actualizar streams y persistir →
/// `after_chunk` → commit. Cualquier fallo revierte el scope, suma un
/// rollback y termina el step con `ChunkFailed`. Tras el commit del chunk
/// cuya lectura devolvió `Exhausted` el step termina (aunque ese chunk esté
/// vacío, su ciclo completo garantiza el último checkpoint).
pub struct ChunkOrientedStep<I, O> {
    pub(crate) config: StepConfig,
    pub(crate) reader: ChunkReader<I>,
    pub(crate) transformer: ChunkTransformer<I, O>,
    pub(crate) writer: ChunkWriter<O>,
    pub(crate) chunk_listeners: Arc<ChunkListeners<I, O>>,
    pub(crate) interruption: Arc<dyn InterruptionPolicy>,
    pub(crate) transaction_manager: Arc<dyn TransactionManager>,
    pub(crate) streams: StreamRegistry,
}

impl<I, O> ChunkOrientedStep<I, O> {
    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    fn process_chunk(&mut self,
                     step_execution: &mut StepExecution,
                     store: &dyn ExecutionMetadataStore)
                     -> Result<ReadState, BatchError> {
        let transaction_manager = Arc::clone(&self.transaction_manager);
        let mut scope = TransactionScope::begin(transaction_manager.as_ref(), &self.config.transaction)?;
        let mut contribution = step_execution.create_contribution();
        let mut processed = Chunk::new();

        let attempt = match self.read_process_write(&mut contribution, &mut processed) {
            Ok(state) => self.prepare_commit(step_execution, contribution, &processed, store)
                             .map(|candidate| (state, candidate)),
            Err(e) => Err(e),
        };

        match attempt {
            Ok((state, candidate)) => match scope.commit() {
                Ok(()) => {
                    *step_execution = candidate;
                    debug!("step '{}' committed chunk (read {} / written {})",
                           self.config.name,
                           step_execution.read_count(),
                           step_execution.write_count());
                    Ok(state)
                }
                Err(e) => Err(self.fail_chunk(step_execution, e, &processed)),
            },
            Err(e) => {
                scope.set_rollback_only();
                let failure = self.fail_chunk(step_execution, e, &processed);
                if let Err(rb) = scope.rollback() {
                    error!("rollback failed for step '{}': {rb}", self.config.name);
                }
                Err(failure)
            }
        }
    }

    fn read_process_write(&mut self,
                          contribution: &mut StepContribution,
                          processed: &mut Chunk<O>)
                          -> Result<ReadState, BatchError> {
        let read = self.reader.read(contribution)?;
        self.chunk_listeners.before_chunk(&read.chunk)?;
        *processed = self.transformer.process(&read.chunk, contribution)?;
        self.writer.write(processed, contribution)?;
        Ok(read.state)
    }

    /// Aplica la contribución sobre una copia del step y la persiste; el
    /// step real sólo se reemplaza cuando el commit tiene éxito.
    fn prepare_commit(&self,
                      step_execution: &StepExecution,
                      mut contribution: StepContribution,
                      processed: &Chunk<O>,
                      store: &dyn ExecutionMetadataStore)
                      -> Result<StepExecution, BatchError> {
        let mut candidate = step_execution.clone();
        contribution.set_exit_status(ExitStatus::completed());
        candidate.apply(contribution);
        candidate.increment_commit_count();
        self.update_streams(candidate.execution_context_mut())?;
        store.update_step_execution(&candidate)?;
        store.update_step_execution_context(&candidate)?;
        candidate.execution_context_mut().clear_dirty();
        self.chunk_listeners.after_chunk(processed)?;
        Ok(candidate)
    }

    fn update_streams(&self, execution_context: &mut ExecutionContext) -> Result<(), BatchError> {
        self.streams
            .collect(self.reader.item_reader(),
                     self.transformer.item_processor(),
                     self.writer.item_writer())
            .update(execution_context)
    }

    /// Si `on_chunk_error` falla, su error reemplaza a la causa original.
    fn fail_chunk(&self, step_execution: &mut StepExecution, cause: BatchError, processed: &Chunk<O>) -> BatchError {
        step_execution.increment_rollback_count();
        error!("step '{}' rolled back chunk: {cause}", self.config.name);
        let cause = match self.chunk_listeners.on_chunk_error(&cause, processed) {
            Ok(()) => cause,
            Err(hook) => {
                warn!("chunk error listener failed for step '{}': {hook}", self.config.name);
                hook
            }
        };
        BatchError::chunk_failed(cause)
    }
}

impl<I, O> ChunkStrategy for ChunkOrientedStep<I, O> {
    fn step_name(&self) -> &str {
        &self.config.name
    }

    fn open(&mut self, execution_context: &ExecutionContext) -> Result<(), BatchError> {
        self.streams
            .collect(self.reader.item_reader(),
                     self.transformer.item_processor(),
                     self.writer.item_writer())
            .open(execution_context)
    }

    fn run(&mut self, step_execution: &mut StepExecution, store: &dyn ExecutionMetadataStore) -> Result<(), BatchError> {
        info!("step '{}' started (chunk size {})", self.config.name, self.config.chunk_size);
        let mut state = ReadState::Reading;
        while state.has_more() {
            self.interruption.check_interrupted(step_execution)?;
            state = self.process_chunk(step_execution, store)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BatchError> {
        self.streams
            .collect(self.reader.item_reader(),
                     self.transformer.item_processor(),
                     self.writer.item_writer())
            .close()
    }
}
