use std::sync::Arc;

use phonebook_app::app::api::routes;
use phonebook_app::config::ConfigHandler;
use phonebook_app::service_handler::ServiceHandler;
use phonebook_core::config::{StoreBackend, load_config};
use phonebook_db::db::connection::create_pool;
use phonebook_db::db::migrations::run_migrations;
use phonebook_db::store::{DirectoryStore, MemoryStore, PgStore};
use phonebook_service::service::{PhonebookService, ServiceOptions};
use phonebook_service::source::Upstreams;
use phonebook_service::sync::SyncScheduler;
use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting phonebook server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let store: Arc<dyn DirectoryStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            run_migrations(&config.database.url).await?;
            let pool = create_pool(
                &config.database.url,
                u32::from(config.database.max_connections),
            )
            .await?;
            tracing::info!("Database connection pool created.");
            Arc::new(PgStore::new(pool))
        }
    };

    let service = PhonebookService::new(
        store,
        Upstreams::default(),
        ServiceOptions {
            strict_merge: config.sync.strict_merge,
            parallelism: config.sync.parallelism,
        },
    );

    match SyncScheduler::from_secs(service.clone(), config.sync.interval_secs) {
        Some(scheduler) => drop(scheduler.spawn()),
        None => tracing::info!("Scheduled sync disabled"),
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(ServiceHandler { service })
        .hoop(ConfigHandler::new(config))
        .push(routes()?);

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
