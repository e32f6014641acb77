use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tin_moi::cli::Menu;
use tin_moi::config::Config;
use tin_moi::routes::{self, AppState};
use tin_moi::service::{start_background_refresh, Aggregator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let serve = std::env::args().nth(1).as_deref() == Some("serve");

    // Initialize logging
    let default_filter = if serve {
        "tin_moi=info,tower_http=debug"
    } else {
        "tin_moi=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config_path =
        std::env::var("TIN_MOI_CONFIG").unwrap_or_else(|_| "sources.toml".to_string());
    let config = Config::load_or_default(&config_path)?;
    info!("Loaded {} sources", config.sources.len());

    let aggregator = Arc::new(Aggregator::from_config(&config)?);

    if serve {
        // Start background refresh task
        let bg_aggregator = aggregator.clone();
        let refresh_interval = config.refresh_interval;
        tokio::spawn(async move {
            start_background_refresh(bg_aggregator, refresh_interval).await;
        });

        let app = routes::router(Arc::new(AppState {
            aggregator: aggregator.clone(),
        }));

        // Start server
        let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
        info!("Server starting on http://{}", config.bind_address);

        axum::serve(listener, app).await?;
    } else {
        let stdin = std::io::stdin();
        let mut menu = Menu::new(aggregator.as_ref(), stdin.lock(), std::io::stdout());
        menu.run().await?;
    }

    Ok(())
}
