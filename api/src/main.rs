use std::{sync::Arc, time::Duration};

use actix_web::{web, HttpServer};
use anyhow::Context;
use log::{info, warn};

use mcp_api::config::{Config, StorageMode};
use mcp_api::{create_app, AppState, Repositories};
use mcp_core::services::clock::{Clock, InstanceLiveness, SystemClock};
use mcp_infra::database::DatabasePool;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("failed to load configuration")?;

    env_logger::init_from_env(
        env_logger::Env::new().default_filter_or(config.app.environment.default_log_filter()),
    );

    info!("Starting MCP hub ({})", config.app.environment);

    let (repositories, pool) = match config.storage {
        StorageMode::Memory => {
            warn!("MCP_STORAGE=memory: tokens and events are lost on restart");
            (Repositories::in_memory(), None)
        }
        StorageMode::MySql => {
            let pool = DatabasePool::new(config.app.database.clone())
                .await
                .context("failed to connect to the database")?;
            pool.run_migrations()
                .await
                .context("failed to run database migrations")?;
            info!("{}", pool.get_statistics());
            (Repositories::mysql(&pool), Some(pool))
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let liveness = Arc::new(InstanceLiveness::starting_now(clock.as_ref()));
    let state = web::Data::new(AppState::new(
        repositories,
        &config.app.auth,
        clock,
        liveness,
    )?);

    let bind_address = config.bind_address();
    info!("Server will bind to: {}", bind_address);

    let cors = config.app.cors.clone();
    let environment = config.app.environment;
    let mut server = HttpServer::new(move || create_app(state.clone(), &cors, environment))
        .client_request_timeout(Duration::from_secs(config.app.server.request_timeout));

    if config.app.server.workers > 0 {
        server = server.workers(config.app.server.workers);
    }

    server
        .bind(&bind_address)
        .with_context(|| format!("failed to bind {}", bind_address))?
        .run()
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
    }

    Ok(())
}
