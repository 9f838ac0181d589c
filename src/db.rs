//! Database connection management
//!
//! Builds the shared connection pool used by every service.

pub mod queries;
pub mod service;

pub use service::{ProblemService, QueryHistoryService, SolutionService};

use crate::config::DatabaseConfig;
use crate::error::AppError;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

/// Create a connection pool with given configuration. No connection is opened yet.
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, AppError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    // The server aborts statements that outlive the executor's deadline
    cfg.options = Some(statement_timeout_option(config.statement_timeout_secs));
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(config.max_pool_size));

    if config.use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| AppError::Config(format!("Failed to create TLS pool: {}", e)))
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Config(format!("Failed to create pool: {}", e)))
    }
}

fn statement_timeout_option(secs: u64) -> String {
    format!("-c statement_timeout={}", secs.saturating_mul(1000))
}

/// Check that the pool can reach the database
pub async fn verify(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    info!("Database connection verified");
    Ok(())
}

#[cfg(test)]
pub(crate) fn lazy_pool() -> Pool {
    // Never connects unless a connection is requested
    create_pool(&DatabaseConfig::default()).expect("pool config is valid")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_timeout_option_is_milliseconds() {
        assert_eq!(statement_timeout_option(30), "-c statement_timeout=30000");
    }

    #[tokio::test]
    async fn test_pool_uses_server_statement_timeout() {
        let Some(pool) = testing::get_test_pool(7).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let client = pool.get().await.unwrap();
        let row = client.query_one("SHOW statement_timeout", &[]).await.unwrap();
        let value: String = row.get(0);
        assert_eq!(value, "7s");
    }
}
