//! Fuentes de items en memoria.

use std::sync::atomic::{AtomicUsize, Ordering};

use chunk_core::{BatchError, ExecutionContext, ItemReader, ItemStream};
use log::debug;

/// Lee una lista en orden y es reiniciable: guarda en el contexto cuántos
/// items entregó bajo la clave `<name>.read.count`.
pub struct ListItemReader<T> {
    name: String,
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T: Clone + Send + Sync> ListItemReader<T> {
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self { name: name.into(),
               items,
               cursor: AtomicUsize::new(0) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Posición del próximo item a entregar.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    fn count_key(&self) -> String {
        format!("{}.read.count", self.name)
    }
}

impl<T: Clone + Send + Sync> ItemReader<T> for ListItemReader<T> {
    fn read(&mut self) -> Result<Option<T>, BatchError> {
        let idx = self.cursor.load(Ordering::SeqCst);
        match self.items.get(idx) {
            Some(item) => {
                self.cursor.store(idx + 1, Ordering::SeqCst);
                Ok(Some(item.clone()))
            }
            None => Ok(None),
        }
    }

    fn as_stream(&self) -> Option<&dyn ItemStream> {
        Some(self)
    }
}

impl<T: Clone + Send + Sync> ItemStream for ListItemReader<T> {
    fn open(&self, execution_context: &ExecutionContext) -> Result<(), BatchError> {
        if let Some(count) = execution_context.get_u64(&self.count_key()) {
            let count = usize::try_from(count).map_err(|e| BatchError::Stream(format!("invalid {}: {e}", self.count_key())))?;
            if count > self.items.len() {
                return Err(BatchError::Stream(format!("reader '{}' cannot resume at {count}: only {} item(s)",
                                                      self.name,
                                                      self.items.len())));
            }
            debug!("reader '{}' resuming at item {count}", self.name);
            self.cursor.store(count, Ordering::SeqCst);
        }
        Ok(())
    }

    fn update(&self, execution_context: &mut ExecutionContext) -> Result<(), BatchError> {
        execution_context.put(self.count_key(), self.position() as u64)
    }
}

/// Adapta cualquier iterador; no guarda estado de reinicio.
pub struct IteratorItemReader<It> {
    iter: It,
}

impl<It> IteratorItemReader<It> {
    pub fn new<C>(items: C) -> Self
        where C: IntoIterator<IntoIter = It>
    {
        Self { iter: items.into_iter() }
    }
}

impl<T, It> ItemReader<T> for IteratorItemReader<It> where It: Iterator<Item = T> + Send + Sync
{
    fn read(&mut self) -> Result<Option<T>, BatchError> {
        Ok(self.iter.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_reader_ends_with_none() {
        let mut reader = ListItemReader::new("numbers", vec![1, 2]);
        assert_eq!(reader.read(), Ok(Some(1)));
        assert_eq!(reader.read(), Ok(Some(2)));
        assert_eq!(reader.read(), Ok(None));
        assert_eq!(reader.read(), Ok(None));
    }

    #[test]
    fn list_reader_resumes_from_context() {
        let mut first = ListItemReader::new("numbers", vec![1, 2, 3, 4]);
        first.read().unwrap();
        first.read().unwrap();
        let mut ctx = ExecutionContext::new();
        first.update(&mut ctx).unwrap();
        assert_eq!(ctx.get_u64("numbers.read.count"), Some(2));

        let mut second = ListItemReader::new("numbers", vec![1, 2, 3, 4]);
        second.open(&ctx).unwrap();
        assert_eq!(second.read(), Ok(Some(3)));
    }

    #[test]
    fn list_reader_rejects_checkpoint_past_the_end() {
        let reader = ListItemReader::new("numbers", vec![1]);
        let mut ctx = ExecutionContext::new();
        ctx.put("numbers.read.count", 5).unwrap();
        assert!(matches!(reader.open(&ctx), Err(BatchError::Stream(_))));
    }

    #[test]
    fn iterator_reader_drains_iterator() {
        let mut reader = IteratorItemReader::new(vec!["a", "b"]);
        assert_eq!(reader.read(), Ok(Some("a")));
        assert_eq!(reader.read(), Ok(Some("b")));
        assert_eq!(reader.read(), Ok(None));
        assert!(ItemReader::<&str>::as_stream(&reader).is_none());
    }
}
