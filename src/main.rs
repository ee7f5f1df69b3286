use std::error::Error;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use events_server::auth::TokenService;
use events_server::config::{Config, StoreBackend};
use events_server::routes::create_routes;
use events_server::state::AppState;
use events_server::store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let tokens = TokenService::new(&config.jwt_secret);

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;

            tracing::info!(
                max_connections = config.max_connections,
                "Successfully connected to database"
            );

            sqlx::migrate!().run(&pool).await?;

            tracing::info!("Migrations run successfully");

            AppState::postgres(PgStore::new(pool), tokens, config.registration_policy)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            AppState::in_memory(tokens, config.registration_policy)
        }
    };

    tracing::info!(policy = ?config.registration_policy, "Event registration policy");

    let app = create_routes(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
