use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use game_asset_api::{api, backend::BackendHandle, config::Config, DiffusionClient};

#[tokio::main]
async fn main() {
    // .env may carry RUST_LOG, so load it before tracing
    Config::dotenv_load();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };
    config.log_summary();

    // The pipeline loads in the background; until it is installed the
    // generation endpoints answer 503 and /health reports it unloaded.
    let backend = BackendHandle::new();
    let loader_config = config.clone();
    let loader_handle = backend.clone();
    tokio::spawn(async move {
        match DiffusionClient::load(&loader_config).await {
            Ok(client) => {
                if let Err(e) = loader_handle.install(Arc::new(client)) {
                    tracing::error!("{}", e);
                }
            }
            Err(e) => tracing::error!("Failed to load inference backend: {}", e),
        }
    });

    let state = Arc::new(api::AppState::new(backend, config.backend_device.clone()));
    let app = api::create_app(state);

    let socket_address = config.socket_addr();
    tracing::info!("listening on {}", socket_address);
    if let Err(e) = axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .await
    {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
