use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_timeline::config::Config;
use news_timeline::db::{ArticleStore, Database};
use news_timeline::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_timeline=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("NEWS_CONFIG").unwrap_or_else(|_| "news.toml".to_string());
    let config = Config::load_or_default(&config_path)?.with_env_overrides();
    info!("Loaded configuration from {}", config_path);

    // Initialize database
    let db = Database::new(&config.database_url).await?;
    db.initialize().await?;
    let count = db.count_articles(None).await?;
    info!("Database initialized with {} articles", count);

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState {
        store: Arc::new(db),
        config,
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server starting on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
