use transfer_handler::config::Config;
use transfer_handler::gateway::VicidialGateway;
use transfer_handler::store::PgRecordStore;
use transfer_handler::types::AppState;

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    // A missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("sqlx", tracing_subscriber::filter::LevelFilter::WARN),
            (
                "transfer_handler",
                tracing_subscriber::filter::LevelFilter::DEBUG,
            ),
        ]));
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let config = Config::from_env().expect("invalid configuration");
    info!(gateway = ?config.gateway, "loaded configuration");

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let store = PgRecordStore::new(db_pool);
    store.migrate().await.expect("failed to run migrations");
    let gateway =
        VicidialGateway::from_config(&config.gateway).expect("failed to build HTTP client");

    let listen_addr = config.listen_addr;
    let app_state = Arc::new(AppState {
        config,
        store: Arc::new(store),
        gateway: Arc::new(gateway),
    });

    info!(%listen_addr, "transfer handler listening");
    axum::Server::bind(&listen_addr)
        .serve(transfer_handler::app(app_state).into_make_service())
        .await
        .unwrap();
}
