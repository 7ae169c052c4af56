use chunk_core::{BatchError, ExecutionContext, ItemReader, ItemStream};

/// Lee secuencialmente de varios lectores: agota el primero, pasa al
/// siguiente, y termina cuando no queda ninguno.
///
/// `open`/`close` se propagan a los delegados con capacidad de stream;
/// `update` no persiste posición propia.
pub struct CompositeItemReader<T> {
    delegates: Vec<Box<dyn ItemReader<T>>>,
    current: usize,
}

impl<T> CompositeItemReader<T> {
    pub fn new(delegates: Vec<Box<dyn ItemReader<T>>>) -> Self {
        Self { delegates,
               current: 0 }
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}

impl<T> ItemReader<T> for CompositeItemReader<T> {
    fn read(&mut self) -> Result<Option<T>, BatchError> {
        while let Some(delegate) = self.delegates.get_mut(self.current) {
            if let Some(item) = delegate.read()? {
                return Ok(Some(item));
            }
            self.current += 1;
        }
        Ok(None)
    }

    fn as_stream(&self) -> Option<&dyn ItemStream> {
        Some(self)
    }
}

impl<T> ItemStream for CompositeItemReader<T> {
    fn open(&self, execution_context: &ExecutionContext) -> Result<(), BatchError> {
        for stream in self.delegates.iter().filter_map(|d| d.as_stream()) {
            stream.open(execution_context)?;
        }
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        for stream in self.delegates.iter().filter_map(|d| d.as_stream()) {
            stream.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{IteratorItemReader, ListItemReader};

    #[test]
    fn reads_delegates_in_order() {
        let delegates: Vec<Box<dyn ItemReader<i32>>> = vec![Box::new(ListItemReader::new("a", vec![1, 2])),
                                                            Box::new(IteratorItemReader::new(Vec::<i32>::new())),
                                                            Box::new(ListItemReader::new("b", vec![3]))];
        let mut reader = CompositeItemReader::new(delegates);
        let mut items = Vec::new();
        while let Some(item) = reader.read().unwrap() {
            items.push(item);
        }
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(reader.read(), Ok(None));
    }

    #[test]
    fn open_restores_each_stream_delegate() {
        let delegates: Vec<Box<dyn ItemReader<i32>>> = vec![Box::new(ListItemReader::new("a", vec![1, 2])),
                                                            Box::new(ListItemReader::new("b", vec![3, 4]))];
        let reader = CompositeItemReader::new(delegates);
        let mut ctx = ExecutionContext::new();
        ctx.put("a.read.count", 2).unwrap();
        ctx.put("b.read.count", 1).unwrap();
        reader.open(&ctx).unwrap();

        let mut reader = reader;
        assert_eq!(reader.read(), Ok(Some(4)));
        assert_eq!(reader.read(), Ok(None));
    }

    #[test]
    fn empty_composite_is_exhausted() {
        let mut reader: CompositeItemReader<u8> = CompositeItemReader::new(Vec::new());
        assert!(reader.is_empty());
        assert_eq!(reader.read(), Ok(None));
    }
}
