use std::sync::Arc;

use crate::chunk::Chunk;
use crate::errors::BatchError;
use crate::item::ItemProcessor;
use crate::listener::ProcessListeners;
use crate::model::StepContribution;

/// Aplica el procesador a cada item de un chunk.
///
/// Un `Ok(None)` del procesador es un filtrado: suma al contador de
/// filtrados y el item no pasa a la salida. Ante un error no se conserva
/// salida parcial.
pub struct ChunkTransformer<I, O> {
    processor: Arc<dyn ItemProcessor<I, O>>,
    listeners: Arc<ProcessListeners<I, O>>,
}

impl<I, O> Clone for ChunkTransformer<I, O> {
    fn clone(&self) -> Self {
        Self { processor: Arc::clone(&self.processor),
               listeners: Arc::clone(&self.listeners) }
    }
}

impl<I, O> ChunkTransformer<I, O> {
    pub fn new(processor: Arc<dyn ItemProcessor<I, O>>, listeners: Arc<ProcessListeners<I, O>>) -> Self {
        Self { processor,
               listeners }
    }

    pub fn item_processor(&self) -> &dyn ItemProcessor<I, O> {
        self.processor.as_ref()
    }

    pub fn process(&self, chunk: &Chunk<I>, contribution: &mut StepContribution) -> Result<Chunk<O>, BatchError> {
        let mut output = Chunk::new();
        let mut filtered = 0;
        for item in chunk {
            match self.process_item(item) {
                Ok(Some(out)) => output.push(out),
                Ok(None) => filtered += 1,
                Err(e) => {
                    self.listeners.on_process_error(item, &e)?;
                    return Err(e);
                }
            }
        }
        contribution.increment_filter_count(filtered);
        Ok(output)
    }

    fn process_item(&self, item: &I) -> Result<Option<O>, BatchError> {
        self.listeners.before_process(item)?;
        let result = self.processor.process(item)?;
        self.listeners.after_process(item, result.as_ref())?;
        Ok(result)
    }
}
