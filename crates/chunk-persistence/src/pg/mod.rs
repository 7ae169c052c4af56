//! Implementación Postgres (Diesel) de `ExecutionMetadataStore`.
//!
//! - Una fila por ejecución de job (`batch_job_execution`) y por ejecución de
//!   step (`batch_step_execution`); el contexto vive en la columna JSONB
//!   `execution_context` de cada una.
//! - `update_*_execution_context` actualiza sólo esa columna por id; no hay
//!   upsert de la fila completa.
//! - Un update sobre una fila inexistente no crea nada (se registra con
//!   `warn!`), igual que el backend en memoria.
//! - Leer el contexto de una fila inexistente devuelve un contexto vacío.
//! - Errores transitorios se reintentan con backoff corto.

use chunk_core::{BatchError, ExecutionContext, ExecutionMetadataStore, StepExecution};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::converter::{context_from_json, context_to_json, new_step_row, step_changeset, step_from_row, NewJobRow,
                       StepRow};
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{batch_job_execution, batch_step_execution};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o uno construido a medida en tests sin
/// acoplar el store a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Clasifica si un error es reintentable.
///
/// Conflictos de serialización y fallos de IO/pool siempre lo son; para
/// `Unknown` se inspecciona el mensaje (deadlock, timeout, conexión caída).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            ["deadlock", "timeout", "timed out", "connection reset", "could not serialize"].iter()
                                                                                          .any(|needle| m.contains(needle))
        }
        _ => false,
    }
}

/// Ejecuta `f` reintentando hasta 3 veces ante errores transitorios con
/// backoff lineal (15ms, 30ms, 45ms).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Store de metadatos de ejecución sobre Postgres.
pub struct PgExecutionMetadataStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgExecutionMetadataStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn load_step(&self, step_execution_id: Uuid) -> Result<Option<StepRow>, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            batch_step_execution::table.find(step_execution_id)
                                       .first::<StepRow>(&mut conn)
                                       .optional()
                                       .map_err(PersistenceError::from)
        })
    }

    /// Lee la columna `execution_context`; fila inexistente => contexto vacío.
    fn load_context<F>(&self, select: F) -> Result<ExecutionContext, PersistenceError>
        where F: Fn(&mut PgConnection) -> QueryResult<Option<Value>>
    {
        let stored = with_retry(|| {
            let mut conn = self.provider.connection()?;
            select(&mut conn).map_err(PersistenceError::from)
        })?;
        match stored {
            Some(doc) => context_from_json(doc),
            None => Ok(ExecutionContext::new()),
        }
    }
}

impl<P: ConnectionProvider> ExecutionMetadataStore for PgExecutionMetadataStore<P> {
    fn create_job_execution(&self, job_execution_id: Uuid, job_name: &str) -> Result<(), BatchError> {
        debug!("create_job_execution id={job_execution_id} name={job_name}");
        let empty = context_to_json(&ExecutionContext::new())?;
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(batch_job_execution::table).values(NewJobRow { job_execution_id,
                                                                               job_name,
                                                                               execution_context: empty.clone() })
                                                           .on_conflict_do_nothing()
                                                           .execute(&mut conn)
                                                           .map_err(PersistenceError::from)
        })?;
        Ok(())
    }

    fn save_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        debug!("save_step_execution id={} step={}",
               step_execution.id,
               step_execution.step_name);
        with_retry(|| {
            let row = new_step_row(step_execution)?;
            let mut conn = self.provider.connection()?;
            // reemplaza la fila completa (save = insert or replace)
            conn.build_transaction()
                .read_write()
                .run(|tx_conn| {
                    diesel::delete(batch_step_execution::table.find(step_execution.id)).execute(tx_conn)?;
                    diesel::insert_into(batch_step_execution::table).values(&row)
                                                                    .execute(tx_conn)
                })
                .map_err(PersistenceError::from)
        })?;
        Ok(())
    }

    fn update_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        let updated = with_retry(|| {
            let changes = step_changeset(step_execution)?;
            let mut conn = self.provider.connection()?;
            diesel::update(batch_step_execution::table.find(step_execution.id)).set(&changes)
                                                                               .execute(&mut conn)
                                                                               .map_err(PersistenceError::from)
        })?;
        if updated == 0 {
            warn!("update of unknown step execution {} ignored", step_execution.id);
        }
        Ok(())
    }

    fn get_step_execution(&self, step_execution_id: Uuid) -> Result<Option<StepExecution>, BatchError> {
        match self.load_step(step_execution_id)? {
            Some(row) => Ok(Some(step_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_step_execution_context(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        let doc = context_to_json(step_execution.execution_context())?;
        let updated = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(batch_step_execution::table.find(step_execution.id))
                .set(batch_step_execution::execution_context.eq(&doc))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })?;
        if updated == 0 {
            warn!("context update of unknown step execution {} ignored",
                  step_execution.id);
        }
        Ok(())
    }

    fn update_job_execution_context(&self,
                                    job_execution_id: Uuid,
                                    execution_context: &ExecutionContext)
                                    -> Result<(), BatchError> {
        let doc = context_to_json(execution_context)?;
        let updated = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(batch_job_execution::table.find(job_execution_id))
                .set(batch_job_execution::execution_context.eq(&doc))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })?;
        if updated == 0 {
            warn!("context update of unknown job execution {job_execution_id} ignored");
        }
        Ok(())
    }

    fn get_step_execution_context(&self, step_execution_id: Uuid) -> Result<ExecutionContext, BatchError> {
        let context = self.load_context(|conn| {
                               batch_step_execution::table.find(step_execution_id)
                                                          .select(batch_step_execution::execution_context)
                                                          .first(conn)
                                                          .optional()
                           })?;
        Ok(context)
    }

    fn get_job_execution_context(&self, job_execution_id: Uuid) -> Result<ExecutionContext, BatchError> {
        let context = self.load_context(|conn| {
                               batch_job_execution::table.find(job_execution_id)
                                                         .select(batch_job_execution::execution_context)
                                                         .first(conn)
                                                         .optional()
                           })?;
        Ok(context)
    }
}

/// Construye un pool Postgres r2d2 a partir de URL y aplica las migraciones
/// pendientes.
///
/// Si `min_size > max_size` se usa `min_size = max_size`; tamaños en cero se
/// elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee `DbConfig` y construye un pool ya
/// migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(is_retryable(&PersistenceError::SerializationConflict));
        assert!(is_retryable(&PersistenceError::TransientIo("pool".into())));
        assert!(is_retryable(&PersistenceError::Unknown("deadlock detected".into())));
        assert!(!is_retryable(&PersistenceError::UniqueViolation("pk".into())));
        assert!(!is_retryable(&PersistenceError::NotFound));
    }

    #[test]
    fn retry_gives_up_after_three_retries() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::TransientIo("down".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn retry_returns_first_success() {
        let calls = Cell::new(0);
        let result = with_retry(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(PersistenceError::SerializationConflict)
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::CheckViolation("read_count".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
