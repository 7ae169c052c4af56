use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use log::{debug, error, info, warn};
use rayon::ThreadPool;

use super::config::StepConfig;
use super::harness::ChunkStrategy;
use super::{ChunkReader, ChunkTransformer, ChunkWriter};
use crate::chunk::{Chunk, ReadState};
use crate::errors::BatchError;
use crate::interruption::InterruptionPolicy;
use crate::item::{CompositeItemStream, StreamRegistry};
use crate::listener::ChunkListeners;
use crate::model::{ExecutionContext, ExitStatus, StepContribution, StepExecution};
use crate::repo::ExecutionMetadataStore;
use crate::transaction::{TransactionAttributes, TransactionManager, TransactionScope};

/// Proceso + escritura de un chunk dentro de su propio scope transaccional.
///
/// Se comparte (vía `Arc`) entre todas las tareas del pool; cada tarea trae
/// su chunk y su contribución.
pub struct ChunkWorker<I, O> {
    transformer: ChunkTransformer<I, O>,
    writer: ChunkWriter<O>,
    chunk_listeners: Arc<ChunkListeners<I, O>>,
    transaction_manager: Arc<dyn TransactionManager>,
    attributes: TransactionAttributes,
}

impl<I, O> ChunkWorker<I, O> {
    pub fn new(transformer: ChunkTransformer<I, O>,
               writer: ChunkWriter<O>,
               chunk_listeners: Arc<ChunkListeners<I, O>>,
               transaction_manager: Arc<dyn TransactionManager>,
               attributes: TransactionAttributes)
               -> Self {
        Self { transformer,
               writer,
               chunk_listeners,
               transaction_manager,
               attributes }
    }

    /// Ejecuta el chunk; la contribución queda COMPLETED o FAILED con la
    /// descripción del fallo.
    pub fn execute(&self, chunk: Chunk<I>, contribution: &mut StepContribution) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute_in_scope(&chunk, contribution)))
            .unwrap_or_else(|payload| Err(BatchError::Worker(panic_message(payload.as_ref()))));
        match outcome {
            Ok(()) => contribution.set_exit_status(ExitStatus::completed()),
            Err(e) => {
                let failure = BatchError::chunk_failed(e);
                error!("chunk worker failed: {failure}");
                contribution.set_exit_status(ExitStatus::failed().with_description(failure.to_string()));
            }
        }
    }

    fn execute_in_scope(&self, chunk: &Chunk<I>, contribution: &mut StepContribution) -> Result<(), BatchError> {
        let mut scope = TransactionScope::begin(self.transaction_manager.as_ref(), &self.attributes)?;
        let mut processed = Chunk::new();
        if let Err(e) = self.process_and_write(chunk, contribution, &mut processed) {
            scope.set_rollback_only();
            let failure = self.notify_chunk_error(e, &processed);
            if let Err(rb) = scope.rollback() {
                error!("chunk rollback failed: {rb}");
            }
            return Err(failure);
        }
        scope.commit().map_err(|e| self.notify_chunk_error(e, &processed))
    }

    fn process_and_write(&self,
                         chunk: &Chunk<I>,
                         contribution: &mut StepContribution,
                         processed: &mut Chunk<O>)
                         -> Result<(), BatchError> {
        self.chunk_listeners.before_chunk(chunk)?;
        *processed = self.transformer.process(chunk, contribution)?;
        self.writer.write(processed, contribution)?;
        self.chunk_listeners.after_chunk(processed)
    }

    /// Devuelve el error a reportar: el del hook si `on_chunk_error` falla.
    fn notify_chunk_error(&self, error: BatchError, processed: &Chunk<O>) -> BatchError {
        match self.chunk_listeners.on_chunk_error(&error, processed) {
            Ok(()) => error,
            Err(hook) => {
                warn!("chunk error listener failed: {hook}");
                hook
            }
        }
    }
}

/// Resultado pendiente de una tarea + instantánea de streams tras leer su
/// chunk.
type PendingChunk = (Receiver<StepContribution>, ExecutionContext);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {s}")
    } else {
        "worker panicked".to_string()
    }
}

/// Orquestador concurrente.
///
/// - La lectura es secuencial, en el hilo que llama.
/// - Cada chunk leído se envía al pool como tarea de proceso + escritura.
/// - Las tareas se guardan en orden de envío; al terminar la lectura se
///   espera a todas y sus contribuciones se aplican en ese mismo orden.
/// - Commit +1 por contribución COMPLETED, rollback +1 por FAILED; un fallo
///   no cancela las demás tareas.
/// - El step y su contexto se persisten una sola vez, al final.
/// - Tras cada lectura se toma una instantánea del estado de los streams; el
///   checkpoint final es la del último chunk confirmado antes del primer
///   chunk fallido en orden de lectura, para que un reinicio vuelva a leer
///   el chunk revertido. Los chunks confirmados después de ese fallo se
///   vuelven a procesar al reiniciar.
pub struct ConcurrentChunkOrientedStep<I, O> {
    pub(crate) config: StepConfig,
    pub(crate) reader: ChunkReader<I>,
    pub(crate) worker: Arc<ChunkWorker<I, O>>,
    pub(crate) interruption: Arc<dyn InterruptionPolicy>,
    pub(crate) streams: StreamRegistry,
    pub(crate) pool: Arc<ThreadPool>,
}

impl<I, O> ConcurrentChunkOrientedStep<I, O>
    where I: Send + 'static,
          O: Send + 'static
{
    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    fn submit(&self, chunk: Chunk<I>, contribution: StepContribution) -> Receiver<StepContribution> {
        let (tx, rx) = mpsc::sync_channel(1);
        let worker = Arc::clone(&self.worker);
        self.pool.spawn(move || {
                      let mut contribution = contribution;
                      worker.execute(chunk, &mut contribution);
                      if tx.send(contribution).is_err() {
                          warn!("chunk result dropped: submitting thread is gone");
                      }
                  });
        rx
    }

    /// Espera cada tarea en orden de envío y aplica su contribución.
    ///
    /// Devuelve la instantánea de streams del último chunk de la racha
    /// inicial sin fallos (`None` si el primer chunk falló).
    fn aggregate(&self,
                 step_execution: &mut StepExecution,
                 pending: Vec<PendingChunk>)
                 -> Option<ExecutionContext> {
        let mut checkpoint = None;
        let mut unbroken = true;
        for (idx, (rx, snapshot)) in pending.into_iter().enumerate() {
            match rx.recv() {
                Ok(contribution) => {
                    if contribution.is_failed() {
                        unbroken = false;
                        step_execution.increment_rollback_count();
                        step_execution.add_failure(contribution.exit_status().description.clone());
                    } else {
                        step_execution.increment_commit_count();
                        if unbroken {
                            checkpoint = Some(snapshot);
                        }
                    }
                    step_execution.apply(contribution);
                }
                Err(_) => {
                    unbroken = false;
                    let failure = BatchError::Worker(format!("chunk task #{idx} ended without result"));
                    error!("step '{}': {failure}", self.config.name);
                    step_execution.increment_rollback_count();
                    step_execution.add_failure(failure.to_string());
                    let exit_status = step_execution.exit_status()
                                                    .clone()
                                                    .and(ExitStatus::failed().with_description(failure.to_string()));
                    step_execution.set_exit_status(exit_status);
                }
            }
        }
        checkpoint
    }

    fn collect_streams(&self) -> CompositeItemStream<'_> {
        self.streams.collect(self.reader.item_reader(),
                             self.worker.transformer.item_processor(),
                             self.worker.writer.item_writer())
    }
}

impl<I, O> ChunkStrategy for ConcurrentChunkOrientedStep<I, O>
    where I: Send + 'static,
          O: Send + 'static
{
    fn step_name(&self) -> &str {
        &self.config.name
    }

    fn open(&mut self, execution_context: &ExecutionContext) -> Result<(), BatchError> {
        self.collect_streams().open(execution_context)
    }

    fn run(&mut self, step_execution: &mut StepExecution, store: &dyn ExecutionMetadataStore) -> Result<(), BatchError> {
        info!("step '{}' started concurrently (chunk size {}, {} worker(s))",
              self.config.name,
              self.config.chunk_size,
              self.config.worker_pool_size);
        let mut pending = Vec::new();
        let mut state = ReadState::Reading;
        let mut stop = None;

        while state.has_more() {
            if let Err(e) = self.interruption.check_interrupted(step_execution) {
                stop = Some(e);
                break;
            }
            let mut contribution = step_execution.create_contribution();
            match self.reader.read(&mut contribution) {
                Ok(read) => {
                    state = read.state;
                    let mut snapshot = step_execution.execution_context().clone();
                    if let Err(e) = self.collect_streams().update(&mut snapshot) {
                        error!("step '{}' could not snapshot its streams: {e}", self.config.name);
                        step_execution.increment_rollback_count();
                        stop = Some(BatchError::chunk_failed(e));
                        break;
                    }
                    debug!("step '{}' submitting chunk #{} ({} item(s))",
                           self.config.name,
                           pending.len(),
                           read.chunk.len());
                    pending.push((self.submit(read.chunk, contribution), snapshot));
                }
                Err(e) => {
                    error!("step '{}' read failed; waiting for {} in-flight chunk(s)", self.config.name, pending.len());
                    step_execution.increment_rollback_count();
                    stop = Some(BatchError::chunk_failed(e));
                    break;
                }
            }
        }

        if let Some(checkpoint) = self.aggregate(step_execution, pending) {
            step_execution.set_execution_context(checkpoint);
        }
        store.update_step_execution(step_execution)?;
        store.update_step_execution_context(step_execution)?;
        step_execution.execution_context_mut().clear_dirty();

        match stop {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), BatchError> {
        self.collect_streams().close()
    }
}
