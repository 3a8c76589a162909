use clap::Parser;
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pesabridge::cli::{Cli, Commands, DbCommands};
use pesabridge::config::Config;
use pesabridge::gateway::{DarajaClient, DarajaSettings};
use pesabridge::services::SettlementEngine;
use pesabridge::{AppState, create_app, db, startup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => pesabridge::cli::handle_db_migrate(&config).await,
        Commands::Config => {
            let pool = db::create_pool(&config).await?;
            let report = startup::validate_environment(&config, &pool).await?;
            report.print();
            if report.is_valid() {
                Ok(())
            } else {
                anyhow::bail!("startup validation failed")
            }
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config).await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    // A missing platform wallet is a fatal configuration error, so it is
    // provisioned before the server accepts requests.
    startup::ensure_platform_wallet(&pool, &config.platform_owner_id).await?;
    tracing::info!(platform_owner_id = %config.platform_owner_id, "platform wallet ready");

    let gateway = DarajaClient::new(DarajaSettings::from_config(&config));
    let engine = SettlementEngine::new(
        pool.clone(),
        config.commission_rate_bps,
        config.platform_owner_id.clone(),
    );

    let state = AppState {
        db: pool,
        gateway,
        engine,
        callback_secret: config.callback_secret.clone(),
    };
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
