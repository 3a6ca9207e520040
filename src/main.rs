use dotenvy::dotenv;
use marketplace::{
    api::{self, AppState},
    config::{Settings, database, packages},
    core::subscription,
    errors::Result,
    notify::{HttpNotifier, LogNotifier, OrderNotifier},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load settings
    let settings = Settings::from_env()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!(bind = %settings.bind_address(), "Settings loaded");

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed subscription packages on first run
    let seed_packages = packages::load_packages_or_default(&settings.packages_path)?;
    let seeded = subscription::initialize_subscription_packages(&db, &seed_packages)
        .await
        .inspect_err(|e| error!("Failed to seed subscription packages: {}", e))?;
    if seeded > 0 {
        info!(seeded, "Seeded subscription packages");
    }

    // 6. Pick where order notifications go
    let notifier: Arc<dyn OrderNotifier> = match &settings.notify_url {
        Some(url) => {
            info!(%url, "Order notifications will be posted");
            Arc::new(HttpNotifier::new(url, settings.notify_timeout)?)
        }
        None => Arc::new(LogNotifier),
    };

    // 7. Serve
    let state = AppState {
        db,
        notifier,
        default_package: settings.default_package.clone(),
        seed_packages: Arc::new(seed_packages),
    };
    let listener = tokio::net::TcpListener::bind(settings.bind_address()).await?;
    info!("Listening on {}", settings.bind_address());
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
