//! Connection pool, migrations and the health probe.

use crate::config::DatabaseSettings;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::sqlx::sqlite::SqliteJournalMode;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub type DbPool = DatabaseConnection;

#[derive(Debug, PartialEq, Eq)]
enum Backend {
    /// Lives only as long as its single connection
    SqliteMemory,
    SqliteFile,
    Postgres,
}

impl Backend {
    fn of(url: &str) -> Self {
        if !url.starts_with("sqlite:") {
            Backend::Postgres
        } else if url.contains(":memory:") || url.contains("mode=memory") {
            Backend::SqliteMemory
        } else {
            Backend::SqliteFile
        }
    }
}

fn connect_options(settings: &DatabaseSettings) -> ConnectOptions {
    let backend = Backend::of(&settings.url);
    let mut opt = ConnectOptions::new(settings.url.clone());
    opt.connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .sqlx_logging(true);

    if backend == Backend::SqliteMemory {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }

    if backend != Backend::Postgres {
        let busy = Duration::from_millis(settings.sqlite_busy_timeout_ms);
        let wal = backend == Backend::SqliteFile;
        opt.map_sqlx_sqlite_opts(move |sqlite| {
            let sqlite = sqlite.busy_timeout(busy).foreign_keys(true);
            if wal {
                sqlite.journal_mode(SqliteJournalMode::Wal)
            } else {
                sqlite
            }
        });
    }
    opt
}

/// Opens the pool described by the `[database]` settings
pub async fn connect(settings: &DatabaseSettings) -> Result<DbPool, ServiceError> {
    debug!(backend = ?Backend::of(&settings.url), "configuring database pool");
    gauge!("asbm_db.max_connections", settings.max_connections as f64);

    let pool = Database::connect(connect_options(settings))
        .await
        .map_err(|e| {
            error!("Database connection failed: {}", e);
            ServiceError::DatabaseError(e)
        })?;

    info!(max_connections = settings.max_connections, "Database pool ready");
    Ok(pool)
}

/// Default pool settings around a bare URL
pub async fn connect_url(url: &str) -> Result<DbPool, ServiceError> {
    connect(&DatabaseSettings {
        url: url.to_string(),
        ..DatabaseSettings::default()
    })
    .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    match crate::migrator::Migrator::up(pool, None).await {
        Ok(()) => {
            info!(elapsed = ?started.elapsed(), "Migrations applied");
            Ok(())
        }
        Err(e) => {
            error!(elapsed = ?started.elapsed(), "Migrations failed: {}", e);
            Err(ServiceError::MigrationError(e.to_string()))
        }
    }
}

/// Pings the database, recording latency and outcome
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    let outcome = pool.ping().await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(()) => {
            histogram!("asbm_db.connection_latency", elapsed);
            counter!("asbm_db.health_check.success", 1);
            Ok(())
        }
        Err(e) => {
            error!("Database health check failed: {}", e);
            counter!("asbm_db.health_check.failure", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

/// Waits for in-flight queries, then closes every connection
pub async fn close_pool(pool: DbPool) {
    if let Err(e) = pool.close().await {
        error!("Error while closing database pool: {}", e);
    } else {
        info!("Database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_are_told_apart_by_url() {
        assert_eq!(Backend::of("sqlite::memory:"), Backend::SqliteMemory);
        assert_eq!(Backend::of("sqlite://erp.db?mode=memory"), Backend::SqliteMemory);
        assert_eq!(Backend::of("sqlite://asbm_erp.db?mode=rwc"), Backend::SqliteFile);
        assert_eq!(Backend::of("postgres://erp@localhost/erp"), Backend::Postgres);
    }

    #[tokio::test]
    async fn connects_and_migrates_in_memory() {
        let pool = connect_url("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        check_connection(&pool).await.unwrap();
    }
}
