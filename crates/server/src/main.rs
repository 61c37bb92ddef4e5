use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod config;
mod db;
mod error;
mod reconcile;
mod routes;
mod state;

use db::{Database, Role, User};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!(
        "Starting rollcall server on {}:{}",
        config.server.host,
        config.server.port
    );

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    seed_default_teacher(&db).await?;

    // Create app state
    let state = AppState::new(db, config.clone());

    // Build router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed a default teacher account so a fresh install can open sessions
/// immediately. The password is a fixed bootstrap credential.
async fn seed_default_teacher(db: &Database) -> Result<()> {
    const DEFAULT_EMAIL: &str = "admin@example.com";
    const DEFAULT_PASSWORD: &str = "admin123";

    if db.get_user_by_email(DEFAULT_EMAIL).await?.is_some() {
        tracing::debug!("default teacher already exists");
        return Ok(());
    }

    let teacher = User {
        id: Uuid::new_v4().to_string(),
        email: DEFAULT_EMAIL.to_string(),
        password_hash: routes::auth::hash_password(DEFAULT_PASSWORD)?,
        role: Role::Teacher,
        created_at: None,
    };
    db.create_user(&teacher).await?;
    tracing::info!("Default teacher account created: {}", DEFAULT_EMAIL);

    Ok(())
}
