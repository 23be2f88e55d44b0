use anyhow::Context;

use federation_infra::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    federation_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let app = federation_api::app::build_app(&settings).await?;

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
