use deadpool_postgres::{Config as PgPoolConfig, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

// Embed SQL migrations at compile time for deterministic startup
const MIGRATIONS: [(&str, &str); 2] = [
    (
        "0001_create_conversations",
        include_str!("../migrations/0001_create_conversations.sql"),
    ),
    (
        "0002_create_messages",
        include_str!("../migrations/0002_create_messages.sql"),
    ),
];

pub async fn init_pool(database_url: &str, max_connections: usize) -> Result<Pool, anyhow::Error> {
    let mut cfg = PgPoolConfig::new();
    cfg.url = Some(database_url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_connections));

    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    tracing::info!(max_connections, "database pool created");

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Apply embedded migrations in order. Every statement is idempotent
/// (`IF NOT EXISTS`), so re-running on an up-to-date schema is a no-op.
pub async fn run_migrations(pool: &Pool) -> Result<(), anyhow::Error> {
    let client = pool.get().await?;
    for (label, sql) in MIGRATIONS {
        client.batch_execute(sql).await?;
        tracing::info!(migration = %label, "realtime-chat-service migration applied");
    }
    Ok(())
}
