use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crewdeck::config::Config;
use crewdeck::db::{self, AppState};
use crewdeck::handlers;
use crewdeck::rate_limit::FixedWindowLimiter;

#[derive(Parser)]
#[command(name = "crewdeck", about = "Project collaboration server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create the database schema and exit.
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewdeck=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::InitDb => {
            let pool = db::open_pool(&config.database_path, config.busy_timeout_ms)?;
            let conn = pool.get()?;
            db::init_schema(&conn)?;
            tracing::info!("schema initialized at {}", config.database_path);
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::open_pool(&config.database_path, config.busy_timeout_ms)?;
    let conn = pool.get()?;
    db::init_schema(&conn)?;
    drop(conn);

    if config.dev_mode {
        tracing::warn!("dev mode enabled: /dev routes are exposed");
    }

    let addr = config.addr();
    let state = AppState {
        db: pool,
        limiter: Arc::new(FixedWindowLimiter::new()),
        config: Arc::new(config),
    };

    let app = handlers::router(state.clone())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
