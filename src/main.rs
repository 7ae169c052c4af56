//! Binario demo: procesa un lote de pedidos sintéticos por chunks.
//!
//! - Con `DATABASE_URL` definido persiste los metadatos en Postgres; si no,
//!   usa el store en memoria.
//! - `CHUNKFLOW_MODE=concurrent` ejecuta los chunks en el pool de workers.

use std::process::ExitCode;
use std::sync::Arc;

use chunkflow::adapters::{processor_fn, ListItemReader, LoggingListener, TransactionalListWriter};
use chunkflow::persistence::{build_dev_pool_from_env, PgExecutionMetadataStore, PoolProvider};
use chunkflow::{AppError, ChunkStrategy, ExecutionMetadataStore, ExecutionMode, InMemoryExecutionStore,
                ResourceTransactionManager, RunConfig, StepBuilder, StepExecution, StepHarness};
use log::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Order {
    id: u32,
    customer: String,
    amount_cents: i64,
}

#[derive(Debug, Clone)]
struct Invoice {
    order_id: u32,
    customer: String,
    total: String,
}

fn orders() -> Vec<Order> {
    (1..=25).map(|id| Order { id,
                              customer: format!("customer-{}", id % 7),
                              amount_cents: i64::from(id) * 1_250 - 5_000 })
            .collect()
}

fn metadata_store() -> Arc<dyn ExecutionMetadataStore> {
    if std::env::var("DATABASE_URL").is_err() {
        info!("DATABASE_URL no definido: usando store en memoria");
        return Arc::new(InMemoryExecutionStore::new());
    }
    match build_dev_pool_from_env() {
        Ok(pool) => Arc::new(PgExecutionMetadataStore::new(PoolProvider { pool })),
        Err(e) => {
            warn!("no se pudo conectar a Postgres ({e}); usando store en memoria");
            Arc::new(InMemoryExecutionStore::new())
        }
    }
}

fn run(config: &RunConfig) -> Result<(), AppError> {
    let store = metadata_store();
    let harness = StepHarness::new(store.clone());
    let step_config = config.step_config("invoiceStep");

    let writer = Arc::new(TransactionalListWriter::new());
    let tm = Arc::new(ResourceTransactionManager::new().with_resource(writer.clone()));
    // pedidos sin importe positivo no se facturan
    let to_invoice = processor_fn(|order: &Order| {
        if order.amount_cents <= 0 {
            return Ok(None);
        }
        Ok(Some(Invoice { order_id: order.id,
                          customer: order.customer.to_uppercase(),
                          total: format!("{}.{:02}", order.amount_cents / 100, order.amount_cents % 100) }))
    });
    let builder = StepBuilder::<Order, Invoice>::new(step_config.clone(),
                                                     Box::new(ListItemReader::new("orderReader", orders())),
                                                     Arc::new(to_invoice),
                                                     writer.clone()).transaction_manager(tm)
                                                                    .listener(Arc::new(LoggingListener::new(&step_config.name)));
    let mut strategy: Box<dyn ChunkStrategy> = match config.mode {
        ExecutionMode::Sequential => Box::new(builder.build()?),
        ExecutionMode::Concurrent => Box::new(builder.build_concurrent()?),
    };

    let job_execution_id = Uuid::new_v4();
    store.create_job_execution(job_execution_id, "invoiceJob")?;
    let mut step_execution = StepExecution::new(&step_config.name, job_execution_id);
    let outcome = harness.execute(strategy.as_mut(), &mut step_execution);

    info!("step {} terminó {:?} ({}) leídos={} escritos={} filtrados={} commits={} rollbacks={}",
          step_execution.step_name,
          step_execution.status(),
          step_execution.exit_status(),
          step_execution.read_count(),
          step_execution.write_count(),
          step_execution.filter_count(),
          step_execution.commit_count(),
          step_execution.rollback_count());
    if let (Some(start), Some(end)) = (step_execution.start_time(), step_execution.end_time()) {
        info!("duración {} ms", (end - start).num_milliseconds());
    }
    if let Some(last) = writer.items().last() {
        info!("última factura: {} {} {}", last.order_id, last.customer, last.total);
    }
    match serde_json::to_string(&step_execution.counts()) {
        Ok(json) => info!("contadores {json}"),
        Err(e) => warn!("no se pudieron serializar los contadores: {e}"),
    }
    outcome?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = match RunConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!("configuración {config:?}");
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
