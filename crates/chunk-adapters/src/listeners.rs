use std::fmt::Debug;
use std::sync::Mutex;

use chunk_core::{BatchError, Chunk, ChunkListener, ItemProcessListener, ItemReadListener, ItemWriteListener};
use log::{debug, warn};

/// Registra cada hook en el log (`debug!` para el flujo normal, `warn!`
/// para errores).
#[derive(Debug, Clone, Default)]
pub struct LoggingListener {
    step_name: String,
}

impl LoggingListener {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self { step_name: step_name.into() }
    }
}

impl<I: Debug> ItemReadListener<I> for LoggingListener {
    fn after_read(&self, item: &I) -> Result<(), BatchError> {
        debug!("[{}] read {item:?}", self.step_name);
        Ok(())
    }

    fn on_read_error(&self, error: &BatchError) -> Result<(), BatchError> {
        warn!("[{}] read error: {error}", self.step_name);
        Ok(())
    }
}

impl<I: Debug, O: Debug> ItemProcessListener<I, O> for LoggingListener {
    fn after_process(&self, item: &I, result: Option<&O>) -> Result<(), BatchError> {
        match result {
            Some(out) => debug!("[{}] processed {item:?} -> {out:?}", self.step_name),
            None => debug!("[{}] filtered {item:?}", self.step_name),
        }
        Ok(())
    }

    fn on_process_error(&self, item: &I, error: &BatchError) -> Result<(), BatchError> {
        warn!("[{}] process error on {item:?}: {error}", self.step_name);
        Ok(())
    }
}

impl<O: Debug> ItemWriteListener<O> for LoggingListener {
    fn after_write(&self, chunk: &Chunk<O>) -> Result<(), BatchError> {
        debug!("[{}] wrote {} item(s)", self.step_name, chunk.len());
        Ok(())
    }

    fn on_write_error(&self, error: &BatchError, chunk: &Chunk<O>) -> Result<(), BatchError> {
        warn!("[{}] write error on {} item(s): {error}", self.step_name, chunk.len());
        Ok(())
    }
}

impl<I: Debug, O: Debug> ChunkListener<I, O> for LoggingListener {
    fn before_chunk(&self, chunk: &Chunk<I>) -> Result<(), BatchError> {
        debug!("[{}] chunk of {} item(s) read", self.step_name, chunk.len());
        Ok(())
    }

    fn on_chunk_error(&self, error: &BatchError, _chunk: &Chunk<O>) -> Result<(), BatchError> {
        warn!("[{}] chunk error: {error}", self.step_name);
        Ok(())
    }
}

/// Acumula una línea por hook invocado, en orden. Pensado para
/// verificaciones (`events()`).
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: Mutex<Vec<String>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Eventos que empiezan con `prefix`.
    pub fn events_starting_with(&self, prefix: &str) -> Vec<String> {
        self.events().into_iter().filter(|e| e.starts_with(prefix)).collect()
    }

    fn record(&self, event: String) -> Result<(), BatchError> {
        self.events
            .lock()
            .map_err(|_| BatchError::Listener("event log poisoned".into()))?
            .push(event);
        Ok(())
    }
}

impl<I: Debug> ItemReadListener<I> for CollectingListener {
    fn before_read(&self) -> Result<(), BatchError> {
        self.record("before_read".into())
    }

    fn after_read(&self, item: &I) -> Result<(), BatchError> {
        self.record(format!("after_read {item:?}"))
    }

    fn on_read_error(&self, error: &BatchError) -> Result<(), BatchError> {
        self.record(format!("on_read_error {error}"))
    }
}

impl<I: Debug, O: Debug> ItemProcessListener<I, O> for CollectingListener {
    fn before_process(&self, item: &I) -> Result<(), BatchError> {
        self.record(format!("before_process {item:?}"))
    }

    fn after_process(&self, item: &I, result: Option<&O>) -> Result<(), BatchError> {
        self.record(format!("after_process {item:?} -> {result:?}"))
    }

    fn on_process_error(&self, item: &I, error: &BatchError) -> Result<(), BatchError> {
        self.record(format!("on_process_error {item:?}: {error}"))
    }
}

impl<O: Debug> ItemWriteListener<O> for CollectingListener {
    fn before_write(&self, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.record(format!("before_write {:?}", chunk.items()))
    }

    fn after_write(&self, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.record(format!("after_write {:?}", chunk.items()))
    }

    fn on_write_error(&self, error: &BatchError, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.record(format!("on_write_error {:?}: {error}", chunk.items()))
    }
}

impl<I: Debug, O: Debug> ChunkListener<I, O> for CollectingListener {
    fn before_chunk(&self, chunk: &Chunk<I>) -> Result<(), BatchError> {
        self.record(format!("before_chunk {:?}", chunk.items()))
    }

    fn after_chunk(&self, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.record(format!("after_chunk {:?}", chunk.items()))
    }

    fn on_chunk_error(&self, error: &BatchError, chunk: &Chunk<O>) -> Result<(), BatchError> {
        self.record(format!("on_chunk_error {:?}: {error}", chunk.items()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_listener_formats_events() {
        let l = CollectingListener::new();
        ItemReadListener::<u8>::after_read(&l, &4).unwrap();
        ItemProcessListener::<u8, u8>::after_process(&l, &4, None).unwrap();
        ChunkListener::<u8, u8>::after_chunk(&l, &vec![8].into()).unwrap();
        assert_eq!(l.events(), vec!["after_read 4", "after_process 4 -> None", "after_chunk [8]"]);
        assert_eq!(l.events_starting_with("after_chunk").len(), 1);
    }
}
