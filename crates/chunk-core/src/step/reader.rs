use log::debug;

use crate::chunk::{Chunk, ChunkRead, ReadState};
use crate::errors::BatchError;
use crate::item::ItemReader;
use crate::listener::ReadListeners;
use crate::model::StepContribution;

/// Acumula hasta `chunk_size` items de la fuente.
///
/// Al encontrar fin de stream devuelve el chunk parcial (posiblemente vacío)
/// junto con `ReadState::Exhausted`; ese chunk igualmente se procesa y se
/// escribe.
pub struct ChunkReader<I> {
    reader: Box<dyn ItemReader<I>>,
    chunk_size: usize,
    listeners: ReadListeners<I>,
}

impl<I> ChunkReader<I> {
    pub fn new(reader: Box<dyn ItemReader<I>>, chunk_size: usize, listeners: ReadListeners<I>) -> Self {
        Self { reader,
               chunk_size,
               listeners }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn item_reader(&self) -> &dyn ItemReader<I> {
        self.reader.as_ref()
    }

    pub fn read(&mut self, contribution: &mut StepContribution) -> Result<ChunkRead<I>, BatchError> {
        let mut chunk = Chunk::bounded(self.chunk_size);
        while !chunk.is_full() {
            match self.read_item() {
                Ok(Some(item)) => {
                    contribution.increment_read_count();
                    chunk.push(item);
                }
                Ok(None) => {
                    debug!("source exhausted after {} item(s) in current chunk", chunk.len());
                    return Ok(ChunkRead { chunk,
                                          state: ReadState::Exhausted });
                }
                Err(e) => {
                    self.listeners.on_read_error(&e)?;
                    return Err(e);
                }
            }
        }
        Ok(ChunkRead { chunk,
                       state: ReadState::Reading })
    }

    /// `before_read` → lectura → `after_read`; un fallo en cualquiera de los
    /// tres se reporta igual que un fallo de la fuente.
    fn read_item(&mut self) -> Result<Option<I>, BatchError> {
        self.listeners.before_read()?;
        let item = self.reader.read()?;
        if let Some(item) = &item {
            self.listeners.after_read(item)?;
        }
        Ok(item)
    }
}
