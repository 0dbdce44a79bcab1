use std::{net::SocketAddr, sync::Arc};

use tokio::signal;
use tracing::{error, info, warn};

use asbm_erp as erp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = erp::config::load_config()?;
    erp::tracing::init_subscriber(&cfg.logging);

    let db_pool = erp::db::connect(&cfg.database).await?;
    if cfg.database.auto_migrate {
        erp::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    tokio::fs::create_dir_all(&cfg.uploads.dir).await?;

    let db_arc = Arc::new(db_pool.clone());
    let auth_service = Arc::new(erp::auth::AuthService::new(cfg.auth.clone(), db_arc.clone()));

    let addr: SocketAddr = cfg.server.bind_address().parse()?;
    let app_state = erp::AppState::new(db_arc, cfg);
    let app = erp::app_router(app_state, auth_service);

    info!("asbm-erp listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    erp::db::close_pool(db_pool).await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
