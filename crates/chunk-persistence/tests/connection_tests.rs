//! Pruebas básicas de configuración y pool (requiere DATABASE_URL válido en entorno).

use chunk_persistence::config::DbConfig;
use chunk_persistence::pg::build_pool;

#[test]
fn create_pool_from_env() {
    let Ok(cfg) = DbConfig::from_env() else {
        eprintln!("DATABASE_URL no definido: omitiendo test");
        return;
    };
    let pool = build_pool(&cfg.url, cfg.min_connections, cfg.max_connections).expect("pool");
    let mut conn = pool.get().expect("conn");
    use diesel::connection::SimpleConnection;
    conn.batch_execute("SELECT 1 FROM batch_step_execution LIMIT 1;")
        .expect("migrated table exists");
}
