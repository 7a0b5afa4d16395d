use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use relay_fcm::{DynPushProvider, FcmClient, FcmClientOptions};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use token_relay_service::{
    config::LogFormat,
    handlers, metrics,
    store::{DynMessageLog, DynRegistryStore, PgMessageLog, PgRegistryStore},
    AdminMessageListener, BroadcastDispatcher, Config, MessageNotifier, TokenRegistrar,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!(?config, "Starting token relay service");

    // No provider credentials, no traffic
    let credentials = config
        .credential_source()
        .and_then(|source| source.load())
        .context("Failed to load push provider credentials")?;
    let project_id = config
        .fcm_project_id
        .clone()
        .unwrap_or_else(|| credentials.project_id.clone());

    let provider: DynPushProvider = Arc::new(
        FcmClient::new(
            project_id.clone(),
            credentials,
            FcmClientOptions {
                multicast_concurrency: config.push_multicast_concurrency,
                ..Default::default()
            },
        )
        .context("Failed to build FCM client")?,
    );
    tracing::info!(project_id = %project_id, "FCM client initialized");

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Successfully connected to database");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;

    let store: DynRegistryStore = Arc::new(PgRegistryStore::new(db_pool.clone()));
    let message_log: DynMessageLog = Arc::new(PgMessageLog::new(db_pool.clone()));

    let registrar = Arc::new(TokenRegistrar::new(store.clone(), provider.clone()));
    let dispatcher = Arc::new(BroadcastDispatcher::new(
        store,
        message_log,
        provider.clone(),
        config.push_send_timeout(),
    ));
    let notifier = Arc::new(MessageNotifier::new(provider, config.admin_topic.clone()));

    // Admin message events run independently of the HTTP surface
    let listener = AdminMessageListener::new(db_pool, notifier);
    tokio::spawn(listener.run());

    let addr = format!("0.0.0.0:{}", config.app_port);
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registrar.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .configure(handlers::configure)
    })
    .bind(&addr)?
    .run()
    .await?;

    Ok(())
}
