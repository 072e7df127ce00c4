use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flagpole::{config, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::from_env()?;

    let db = PgPool::connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let state = state::AppState {
        db,
        jwt_secret: config.jwt_secret.clone().into(),
    };

    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    info!(addr = %config.addr(), "flag server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
