#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chunk_adapters::{processor_fn, ListItemReader, TransactionalListWriter};
use chunk_core::{BatchError, Chunk, ItemProcessor, ItemReader, ItemWriter, ResourceTransactionManager, StepBuilder,
                 StepConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: u32,
    pub name: String,
}

pub fn people(n: u32) -> Vec<Person> {
    (1..=n).map(|id| Person { id, name: format!("foo{id}") }).collect()
}

pub fn ids(items: &[Person]) -> Vec<u32> {
    items.iter().map(|p| p.id).collect()
}

/// Pasa el nombre a mayúsculas; falla en los ids de `fail_on`.
pub fn uppercase(fail_on: &'static [u32]) -> Arc<dyn ItemProcessor<Person, Person>> {
    Arc::new(processor_fn(move |p: &Person| {
                 if fail_on.contains(&p.id) {
                     return Err(BatchError::Process(format!("Unable to process item {p:?}")));
                 }
                 Ok(Some(Person { id: p.id,
                                  name: p.name.to_uppercase() }))
             }))
}

/// Igual que `uppercase` pero demora los ids de `slow` para desordenar la
/// finalización de las tareas concurrentes.
pub fn slow_uppercase(fail_on: &'static [u32], slow: &'static [u32]) -> Arc<dyn ItemProcessor<Person, Person>> {
    Arc::new(processor_fn(move |p: &Person| {
                 if slow.contains(&p.id) {
                     thread::sleep(Duration::from_millis(50));
                 }
                 if fail_on.contains(&p.id) {
                     return Err(BatchError::Process(format!("Unable to process item {p:?}")));
                 }
                 Ok(Some(p.clone()))
             }))
}

/// Igual que `uppercase` pero entra en pánico en los ids de `panic_on`.
pub fn panicking_uppercase(panic_on: &'static [u32]) -> Arc<dyn ItemProcessor<Person, Person>> {
    Arc::new(processor_fn(move |p: &Person| {
                 if panic_on.contains(&p.id) {
                     panic!("corrupt record {}", p.id);
                 }
                 Ok(Some(Person { id: p.id,
                                  name: p.name.to_uppercase() }))
             }))
}

/// Fuente de `total` personas que falla al leer el id `fail_at`.
pub struct FailingReader {
    next: u32,
    total: u32,
    fail_at: u32,
}

impl FailingReader {
    pub fn new(total: u32, fail_at: u32) -> Self {
        Self { next: 0,
               total,
               fail_at }
    }
}

impl ItemReader<Person> for FailingReader {
    fn read(&mut self) -> Result<Option<Person>, BatchError> {
        self.next += 1;
        if self.next == self.fail_at {
            return Err(BatchError::Read(format!("Unable to read item {}", self.next)));
        }
        if self.next > self.total {
            return Ok(None);
        }
        Ok(Some(Person { id: self.next,
                         name: format!("foo{}", self.next) }))
    }
}

/// Escribe en el destino transaccional y luego falla si el chunk contiene
/// alguno de los ids de `fail_on`.
pub struct FailingAfterWrite {
    pub inner: Arc<TransactionalListWriter<Person>>,
    pub fail_on: &'static [u32],
}

impl ItemWriter<Person> for FailingAfterWrite {
    fn write(&self, chunk: &Chunk<Person>) -> Result<(), BatchError> {
        self.inner.write(chunk)?;
        if chunk.iter().any(|p| self.fail_on.contains(&p.id)) {
            return Err(BatchError::Write(format!("constraint violation in chunk {:?}", ids(chunk.items()))));
        }
        Ok(())
    }
}

/// Destino + gestor de transacciones con el destino registrado como recurso.
pub fn transactional_sink() -> (Arc<TransactionalListWriter<Person>>, Arc<ResourceTransactionManager>) {
    let writer = Arc::new(TransactionalListWriter::new());
    let tm = Arc::new(ResourceTransactionManager::new().with_resource(writer.clone()));
    (writer, tm)
}

/// Builder típico: lector de `n` personas, procesador dado, destino
/// transaccional.
pub fn person_step(config: StepConfig,
                   n: u32,
                   processor: Arc<dyn ItemProcessor<Person, Person>>)
                   -> (StepBuilder<Person, Person>, Arc<TransactionalListWriter<Person>>, Arc<ResourceTransactionManager>) {
    let (writer, tm) = transactional_sink();
    let builder = StepBuilder::new(config,
                                   Box::new(ListItemReader::new("personItemReader", people(n))),
                                   processor,
                                   writer.clone()).transaction_manager(tm.clone());
    (builder, writer, tm)
}
