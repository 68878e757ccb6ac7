//! Process entry point: config, logging, storage, scheduler, and the HTTP
//! server (spec §6 "Process model").

mod api;
mod auth;
mod config;
mod logging;
mod metrics_middleware;
mod state;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use state::AppState;
use std::process::ExitCode;
use std::sync::Arc;
use strata_engine::{load_or_init_world_seed, Scheduler, StorePlayerSink};
use strata_primitives::SystemClock;
use strata_store::{build_pool, run_migrations, PoolConfig, Store};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.log_level, config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pool_cfg = PoolConfig {
        max_open_conns: config.db_max_open_conns,
        max_idle_conns: config.db_max_idle_conns,
        conn_max_lifetime: config.db_conn_max_lifetime,
    };

    let db_path = config.db_path.clone();
    let pool = {
        let db_path = db_path.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            {
                let mut conn = rusqlite::Connection::open(&db_path)?;
                run_migrations(&mut conn)?;
            }
            Ok(build_pool(&db_path, &pool_cfg)?)
        })
        .await??
    };
    let store = Store::new(pool);

    let world_seed = {
        let store = store.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            load_or_init_world_seed(&store, &conn)
        })
        .await??
    };
    info!(world_seed, db_path = %db_path, "storage initialized");

    let clock = Arc::new(SystemClock);
    let player_sink = Arc::new(StorePlayerSink::new(store.clone()));
    let app_state = AppState::new(store.clone(), clock.clone(), world_seed, player_sink);

    let scheduler = Arc::new(Scheduler::new(store.clone(), clock));
    let (shutdown_tx, scheduler_handles) = scheduler.spawn();

    let port = config.port;
    let bind_store = store.clone();
    let server = HttpServer::new(move || {
        let session_auth = auth::SessionAuth::new(bind_store.clone());
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .wrap(metrics_middleware::RequestMetrics)
            .configure(api::health::configure)
            .configure(api::chunks::configure)
            .configure(api::players::configure)
            .service(
                web::scope("")
                    .wrap(session_auth)
                    .configure(api::nodes::configure)
                    .configure(api::players::configure_authenticated),
            )
    })
    .client_request_timeout(config.read_timeout)
    .client_disconnect_timeout(config.write_timeout)
    .keep_alive(config.idle_timeout)
    .shutdown_timeout(config.shutdown_timeout.as_secs())
    .bind(("0.0.0.0", port))?
    .run();

    let server_handle = server.handle();
    tokio::spawn(wait_for_shutdown_signal(server_handle));

    let result = server.await;

    let _ = shutdown_tx.send(true);
    for handle in scheduler_handles {
        let _ = handle.await;
    }

    result.map_err(anyhow::Error::from)
}

async fn wait_for_shutdown_signal(handle: actix_web::dev::ServerHandle) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("received SIGTERM, starting graceful shutdown"),
    }

    handle.stop(true).await;
}
