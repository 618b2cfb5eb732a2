use anyhow::Result;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use carelink_backend::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("🗄️ Migrations applied");

    let app = carelink_backend::app(pool);

    tracing::info!("🧠 Server running at {}", config.bind_addr);

    axum::serve(
        tokio::net::TcpListener::bind(config.bind_addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
