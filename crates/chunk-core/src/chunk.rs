//! `Chunk<T>`: lote acotado de items procesado y confirmado como una unidad.
//!
//! Un chunk se crea vacío en cada iteración, sólo admite `push` (append-only)
//! y se descarta tras la escritura o el rollback.

/// Secuencia ordenada de items, opcionalmente acotada por el tamaño de chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<T> {
    items: Vec<T>,
    limit: Option<usize>,
}

impl<T> Chunk<T> {
    /// Chunk sin límite (salida del procesamiento).
    pub fn new() -> Self {
        Self { items: Vec::new(), limit: None }
    }

    /// Chunk acotado a `limit` items (entrada leída de la fuente).
    pub fn bounded(limit: usize) -> Self {
        Self { items: Vec::with_capacity(limit),
               limit: Some(limit) }
    }

    /// Agrega un item al final. El lector nunca excede el límite.
    pub fn push(&mut self, item: T) {
        debug_assert!(!self.is_full(), "chunk excede su tamaño configurado");
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `true` cuando se alcanzó el límite configurado.
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|l| self.items.len() >= l)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Chunk<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for Chunk<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items, limit: None }
    }
}

impl<'a, T> IntoIterator for &'a Chunk<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for Chunk<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Estado de la lectura: reemplaza al flag mutable "hay más items".
///
/// Transiciones válidas:
/// - `Reading` -> `Reading` (chunk lleno)
/// - `Reading` -> `Exhausted` (la fuente señaló fin de stream)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// La fuente puede tener más items.
    Reading,
    /// La fuente devolvió fin de stream; no habrá más chunks.
    Exhausted,
}

impl ReadState {
    pub fn has_more(self) -> bool {
        matches!(self, ReadState::Reading)
    }
}

/// Resultado de leer un chunk: los items y el estado que provocaron.
#[derive(Debug)]
pub struct ChunkRead<I> {
    pub chunk: Chunk<I>,
    pub state: ReadState,
}
