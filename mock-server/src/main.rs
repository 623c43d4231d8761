use mock_server::AppConfig;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let mut config = AppConfig::default();
    if let Ok(key) = std::env::var("MOCK_API_KEY") {
        config.api_key = key;
    }
    config.max_namespaces = std::env::var("MOCK_MAX_NAMESPACES")
        .ok()
        .and_then(|v| v.parse().ok());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, max_namespaces = ?config.max_namespaces, "mock context-memory API listening");
    mock_server::run_with(listener, config).await
}
