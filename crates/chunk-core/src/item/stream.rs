use std::sync::Arc;

use log::warn;

use super::{ItemProcessor, ItemReader, ItemWriter};
use crate::errors::BatchError;
use crate::model::ExecutionContext;

/// Capacidad opcional de checkpoint de un colaborador.
///
/// Los métodos reciben `&self`: los colaboradores se comparten entre hilos
/// y usan mutabilidad interior para su estado de reinicio.
pub trait ItemStream: Send + Sync {
    /// Restaura el estado a partir del contexto (reinicio) antes del primer chunk.
    fn open(&self, _execution_context: &ExecutionContext) -> Result<(), BatchError> {
        Ok(())
    }

    /// Vuelca el estado actual en el contexto; se llama dentro de cada commit.
    fn update(&self, _execution_context: &mut ExecutionContext) -> Result<(), BatchError> {
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Qué colaboradores declararon capacidad de stream al construir el step,
/// más los streams registrados explícitamente.
#[derive(Default, Clone)]
pub struct StreamRegistry {
    reader: bool,
    processor: bool,
    writer: bool,
    extra: Vec<Arc<dyn ItemStream>>,
}

impl StreamRegistry {
    /// Consulta la capacidad una única vez.
    pub fn detect<I, O>(reader: &dyn ItemReader<I>, processor: &dyn ItemProcessor<I, O>, writer: &dyn ItemWriter<O>) -> Self {
        Self { reader: reader.as_stream().is_some(),
               processor: processor.as_stream().is_some(),
               writer: writer.as_stream().is_some(),
               extra: Vec::new() }
    }

    pub fn register(&mut self, stream: Arc<dyn ItemStream>) {
        self.extra.push(stream);
    }

    pub fn len(&self) -> usize {
        [self.reader, self.processor, self.writer].iter().filter(|b| **b).count() + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arma el compuesto (lector, procesador, escritor, extras) para una fase.
    pub fn collect<'a, I, O>(&'a self,
                             reader: &'a dyn ItemReader<I>,
                             processor: &'a dyn ItemProcessor<I, O>,
                             writer: &'a dyn ItemWriter<O>)
                             -> CompositeItemStream<'a> {
        let mut composite = CompositeItemStream::new();
        if self.reader {
            if let Some(s) = reader.as_stream() {
                composite.register(s);
            }
        }
        if self.processor {
            if let Some(s) = processor.as_stream() {
                composite.register(s);
            }
        }
        if self.writer {
            if let Some(s) = writer.as_stream() {
                composite.register(s);
            }
        }
        for s in &self.extra {
            composite.register(s.as_ref());
        }
        composite
    }
}

/// Compuesto de streams: `open`/`update` en orden de registro, `close` en
/// orden inverso.
#[derive(Default)]
pub struct CompositeItemStream<'a> {
    streams: Vec<&'a dyn ItemStream>,
}

impl<'a> CompositeItemStream<'a> {
    pub fn new() -> Self {
        Self { streams: Vec::new() }
    }

    pub fn register(&mut self, stream: &'a dyn ItemStream) {
        self.streams.push(stream);
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn open(&self, execution_context: &ExecutionContext) -> Result<(), BatchError> {
        for s in &self.streams {
            s.open(execution_context)?;
        }
        Ok(())
    }

    pub fn update(&self, execution_context: &mut ExecutionContext) -> Result<(), BatchError> {
        for s in &self.streams {
            s.update(execution_context)?;
        }
        Ok(())
    }

    /// Cierra todos los streams aunque alguno falle; devuelve el primer error.
    pub fn close(&self) -> Result<(), BatchError> {
        let mut first_error = None;
        for s in self.streams.iter().rev() {
            if let Err(e) = s.close() {
                warn!("error closing item stream: {e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
