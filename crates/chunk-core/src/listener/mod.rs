//! Cadena de listeners alrededor de lectura, proceso, escritura y chunk.
//!
//! Los hooks son puramente de efecto lateral: no alteran datos ni el flujo
//! de control. Un hook que devuelve `Err` no se trata de forma especial: el
//! error se propaga como un fallo de la fase en la que se disparó.
//!
//! Orden de invocación en una cadena con varios listeners:
//! - hooks `before_*`: orden de registro.
//! - hooks `after_*` y `on_*_error`: orden inverso de registro.

use std::sync::Arc;

use crate::chunk::Chunk;
use crate::errors::BatchError;

pub trait ItemReadListener<I>: Send + Sync {
    fn before_read(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn after_read(&self, _item: &I) -> Result<(), BatchError> {
        Ok(())
    }

    fn on_read_error(&self, _error: &BatchError) -> Result<(), BatchError> {
        Ok(())
    }
}

pub trait ItemProcessListener<I, O>: Send + Sync {
    fn before_process(&self, _item: &I) -> Result<(), BatchError> {
        Ok(())
    }

    /// `result` es `None` cuando el item fue filtrado.
    fn after_process(&self, _item: &I, _result: Option<&O>) -> Result<(), BatchError> {
        Ok(())
    }

    fn on_process_error(&self, _item: &I, _error: &BatchError) -> Result<(), BatchError> {
        Ok(())
    }
}

pub trait ItemWriteListener<O>: Send + Sync {
    fn before_write(&self, _chunk: &Chunk<O>) -> Result<(), BatchError> {
        Ok(())
    }

    fn after_write(&self, _chunk: &Chunk<O>) -> Result<(), BatchError> {
        Ok(())
    }

    fn on_write_error(&self, _error: &BatchError, _chunk: &Chunk<O>) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Hooks de límite de chunk. Todos se invocan dentro del scope transaccional;
/// `on_chunk_error` se invoca justo antes del rollback.
pub trait ChunkListener<I, O>: Send + Sync {
    /// Tras leer el chunk, antes de procesarlo.
    fn before_chunk(&self, _chunk: &Chunk<I>) -> Result<(), BatchError> {
        Ok(())
    }

    /// Tras escribir el chunk procesado, antes del commit.
    fn after_chunk(&self, _chunk: &Chunk<O>) -> Result<(), BatchError> {
        Ok(())
    }

    /// `chunk` es la salida procesada parcial disponible al fallar (puede
    /// estar vacía).
    fn on_chunk_error(&self, _error: &BatchError, _chunk: &Chunk<O>) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Lista ordenada de listeners de un mismo tipo.
pub struct ListenerChain<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

pub type ReadListeners<I> = ListenerChain<dyn ItemReadListener<I>>;
pub type ProcessListeners<I, O> = ListenerChain<dyn ItemProcessListener<I, O>>;
pub type WriteListeners<O> = ListenerChain<dyn ItemWriteListener<O>>;
pub type ChunkListeners<I, O> = ListenerChain<dyn ChunkListener<I, O>>;

impl<L: ?Sized> ListenerChain<L> {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn register(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn forward(&self) -> impl Iterator<Item = &Arc<L>> {
        self.listeners.iter()
    }

    fn reverse(&self) -> impl Iterator<Item = &Arc<L>> {
        self.listeners.iter().rev()
    }
}

impl<L: ?Sized> Default for ListenerChain<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> ListenerChain<dyn ItemReadListener<I>> {
    pub fn before_read(&self) -> Result<(), BatchError> {
        self.forward().try_for_each(|l| l.before_read())
    }

    pub fn after_read(&self, item: &I) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.after_read(item))
    }

    pub fn on_read_error(&self, error: &BatchError) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.on_read_error(error))
    }
}

impl<I, O> ListenerChain<dyn ItemProcessListener<I, O>> {
    pub fn before_process(&self, item: &I) -> Result<(), BatchError> {
        self.forward().try_for_each(|l| l.before_process(item))
    }

    pub fn after_process(&self, item: &I, result: Option<&O>) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.after_process(item, result))
    }

    pub fn on_process_error(&self, item: &I, error: &BatchError) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.on_process_error(item, error))
    }
}

impl<O> ListenerChain<dyn ItemWriteListener<O>> {
    pub fn before_write(&self, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.forward().try_for_each(|l| l.before_write(chunk))
    }

    pub fn after_write(&self, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.after_write(chunk))
    }

    pub fn on_write_error(&self, error: &BatchError, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.on_write_error(error, chunk))
    }
}

impl<I, O> ListenerChain<dyn ChunkListener<I, O>> {
    pub fn before_chunk(&self, chunk: &Chunk<I>) -> Result<(), BatchError> {
        self.forward().try_for_each(|l| l.before_chunk(chunk))
    }

    pub fn after_chunk(&self, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.after_chunk(chunk))
    }

    pub fn on_chunk_error(&self, error: &BatchError, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.reverse().try_for_each(|l| l.on_chunk_error(error, chunk))
    }
}
