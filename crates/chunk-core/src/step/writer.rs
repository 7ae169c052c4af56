use std::sync::Arc;

use crate::chunk::Chunk;
use crate::errors::BatchError;
use crate::item::ItemWriter;
use crate::listener::WriteListeners;
use crate::model::StepContribution;

/// Escribe un chunk procesado en el destino como una sola operación.
pub struct ChunkWriter<O> {
    writer: Arc<dyn ItemWriter<O>>,
    listeners: Arc<WriteListeners<O>>,
}

impl<O> Clone for ChunkWriter<O> {
    fn clone(&self) -> Self {
        Self { writer: Arc::clone(&self.writer),
               listeners: Arc::clone(&self.listeners) }
    }
}

impl<O> ChunkWriter<O> {
    pub fn new(writer: Arc<dyn ItemWriter<O>>, listeners: Arc<WriteListeners<O>>) -> Self {
        Self { writer,
               listeners }
    }

    pub fn item_writer(&self) -> &dyn ItemWriter<O> {
        self.writer.as_ref()
    }

    /// Un fallo del destino o de `before_write`/`after_write` dispara
    /// `on_write_error` y se propaga.
    pub fn write(&self, chunk: &Chunk<O>, contribution: &mut StepContribution) -> Result<(), BatchError> {
        if let Err(e) = self.write_with_hooks(chunk, contribution) {
            self.listeners.on_write_error(&e, chunk)?;
            return Err(e);
        }
        Ok(())
    }

    fn write_with_hooks(&self, chunk: &Chunk<O>, contribution: &mut StepContribution) -> Result<(), BatchError> {
        self.listeners.before_write(chunk)?;
        self.writer.write(chunk)?;
        contribution.increment_write_count(chunk.len() as u64);
        self.listeners.after_write(chunk)
    }
}
