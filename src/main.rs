use std::net::SocketAddr;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod catalogue;
mod config;
mod diagnosis;
mod errors;
mod fetch;
mod model;
mod preprocess;
mod routes;

use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    fetch::ensure_files_exist(&config).await;

    let model = match model::load(&config) {
        Ok(model) => {
            tracing::info!("Model '{}' loaded successfully.", config.model_path);
            tracing::info!("Model input shape: {}", model.info().input_shape);
            Some(model)
        }
        Err(err) => {
            tracing::error!("Error loading model: {}", err);
            None
        }
    };

    let labels = catalogue::load_labels(&config.class_list_path);
    tracing::info!("Loaded {} class names.", labels.len());

    let state = AppState::new(model, labels, catalogue::disease_table());
    let app = routes::handler(state, config.debug_endpoints, config.body_limit_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
