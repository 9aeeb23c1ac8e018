use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::EnvFilter;

use eventhub::{app, config::Config, db, images::ImageStore, notifier::Notifier, state::AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("eventhub=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("invalid configuration");

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("failed to parse DATABASE_URL")
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .expect("failed to connect to db");

    db::init_schema(&pool)
        .await
        .expect("failed to initialize schema");

    let state = AppState::new(
        pool,
        Notifier::new(),
        ImageStore::new(&config.upload_dir),
        config.jwt_secret.clone(),
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!(%addr, "listening");
    axum::serve(listener, app(state)).await.unwrap();
}
