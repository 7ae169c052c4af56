//! Contratos de los colaboradores externos: fuente, transformación y destino.
//!
//! - `ItemReader`: lectura de un item a la vez; `Ok(None)` es fin de stream.
//! - `ItemProcessor`: transforma un item; `Ok(None)` es un filtrado (no error).
//! - `ItemWriter`: escritura de un chunk completo como una sola operación.
//!
//! Los colaboradores con estado de checkpoint lo declaran explícitamente
//! devolviendo `Some` en `as_stream()`; el step lo consulta una sola vez al
//! construirse.

pub mod stream;

use crate::chunk::Chunk;
use crate::errors::BatchError;

pub use stream::{CompositeItemStream, ItemStream, StreamRegistry};

/// Fuente de items. Sólo la usa el hilo que lee, por eso `&mut self`.
pub trait ItemReader<I>: Send + Sync {
    fn read(&mut self) -> Result<Option<I>, BatchError>;

    fn as_stream(&self) -> Option<&dyn ItemStream> {
        None
    }
}

/// Transformación de items. Compartida entre workers en modo concurrente.
pub trait ItemProcessor<I, O>: Send + Sync {
    fn process(&self, item: &I) -> Result<Option<O>, BatchError>;

    fn as_stream(&self) -> Option<&dyn ItemStream> {
        None
    }
}

/// Destino de items: escribe un chunk procesado en una sola operación.
pub trait ItemWriter<O>: Send + Sync {
    fn write(&self, chunk: &Chunk<O>) -> Result<(), BatchError>;

    fn as_stream(&self) -> Option<&dyn ItemStream> {
        None
    }
}

impl<I, R: ItemReader<I> + ?Sized> ItemReader<I> for Box<R> {
    fn read(&mut self) -> Result<Option<I>, BatchError> {
        (**self).read()
    }

    fn as_stream(&self) -> Option<&dyn ItemStream> {
        (**self).as_stream()
    }
}
