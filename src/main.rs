// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use blogicum::config::Config;
use blogicum::models::user::NewUser;
use blogicum::repository::{BlogRepository, PgRepository, RepositoryState};
use blogicum::routes;
use blogicum::state::AppState;
use blogicum::utils::hash::hash_password;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CONNECT_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // Dropping the guard stops the file writer, so it lives as long as main.
    let _guard = init_tracing(&config);

    let pool = match connect_with_retry(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => panic!(
            "Failed to connect to database after {} attempts: {}",
            CONNECT_ATTEMPTS, e
        ),
    };
    tracing::info!("Database connected");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied");

    let repo: RepositoryState = Arc::new(PgRepository::new(pool));

    if let Err(e) = seed_superuser(repo.as_ref(), &config).await {
        tracing::error!("Failed to seed superuser: {:?}", e);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = routes::create_router(AppState { repo, config });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await.expect("Server error");
}

/// Stdout plus a daily rolling file under `logs/`, both filtered by `RUST_LOG`.
fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.rust_log))
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}

/// The database container may come up after the app does.
async fn connect_with_retry(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await;

        match result {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt >= CONNECT_ATTEMPTS => return Err(e),
            Err(_) => {
                tracing::warn!("Database not ready, retrying in 2s (attempt {})", attempt);
                attempt += 1;
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn seed_superuser(
    repo: &dyn BlogRepository,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if repo.find_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding superuser: {}", username);
    repo.create_user(NewUser {
        username: username.clone(),
        password_hash: hash_password(password)?,
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        is_superuser: true,
    })
    .await?;

    Ok(())
}
