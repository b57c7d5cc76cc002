//! exportflow server: Postgres-backed workflow engine behind the REST boundary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use exportflow::engine::TransitionEngine;
use exportflow::storage::postgres::PostgresExportStore;

#[derive(Debug, Parser)]
#[command(name = "exportflow-server", about = "Export status workflow service")]
struct Args {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Address to bind the HTTP server on
    #[arg(long, env = "EXPORTFLOW_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Maximum database connections
    #[arg(long, env = "EXPORTFLOW_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Skip running migrations on startup
    #[arg(long, default_value_t = false)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .connect(&args.database_url)
        .await
        .context("Failed to connect to database")?;

    if !args.no_migrate {
        exportflow::migrator()
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    let store = Arc::new(PostgresExportStore::new(pool));
    let engine = TransitionEngine::new(store);

    exportflow::http::serve(args.bind, engine)
        .await
        .context("Server exited with error")?;

    Ok(())
}
