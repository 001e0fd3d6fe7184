use anyhow::Result;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tracing_subscriber::EnvFilter;

use product_imagegen::{app::AppState, config::AppConfig, mcp_server::ImageGenServer, web};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    let bind_address = config.bind_address();
    let prefix = match config.server.secret_key.as_deref() {
        Some(value) => format!("/{}", value),
        None => String::new(),
    };
    let mcp_path = format!("{prefix}/mcp");
    tracing::info!("Data directory: {}", config.data_dir.display());
    if !config.storage.has_credentials() {
        tracing::warn!("No object store credentials in the environment; stored settings must provide them");
    }

    let state = AppState::new(config)?;
    let state_for_service = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(ImageGenServer::new(state_for_service.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let api = web::router(state);
    let api = if prefix.is_empty() {
        api
    } else {
        axum::Router::new().nest(&prefix, api)
    };
    let router = api.nest_service(&mcp_path, service);

    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(
        "Product image server started at http://{}{} (MCP at {})",
        bind_address,
        prefix,
        mcp_path
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
