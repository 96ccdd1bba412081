use std::net::SocketAddr;

use anyhow::Result;
use farm_api::{build_app, AppConfig};
use farm_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("farm_api");

    let config = AppConfig::from_env();
    let bind = config.bind.clone();

    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "farm assistant api started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
