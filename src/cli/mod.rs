use anyhow::{bail, ensure, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::info;

use crate::app::app;
use crate::auth::hash_password;
use crate::blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use crate::config::AppConfig;
use crate::database::models::NewUser;
use crate::database::seed::{seed_demo, DEMO_PASSWORD};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::services::user_service::PASSWORD_MIN_CHARS;
use crate::state::AppState;
use crate::types::Role;

#[derive(Parser)]
#[command(name = "desk-api")]
#[command(about = "Request desk API - solicitudes routed to area agents")]
#[command(version)]
pub struct Cli {
    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Override the configured port")]
        port: Option<u16>,

        #[arg(long, value_enum, default_value_t = StoreKind::Postgres)]
        store: StoreKind,

        #[arg(long, help = "Create the demo catalog and one account per role")]
        seed_demo: bool,
    },

    #[command(about = "Apply the embedded database migrations")]
    Migrate,

    #[command(about = "Create the first SuperAdministrador account")]
    BootstrapAdmin {
        #[arg(long, default_value = "root")]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    #[command(about = "Print a password hash for manual provisioning")]
    HashPassword { password: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// PostgreSQL at DATABASE_URL
    Postgres,
    /// Process-local store; data is lost on exit
    Memory,
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        store: StoreKind::Postgres,
        seed_demo: false,
    });

    match command {
        Commands::Serve {
            port,
            store,
            seed_demo,
        } => serve(config, port, store, seed_demo).await,
        Commands::Migrate => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            Ok(())
        }
        Commands::BootstrapAdmin {
            username,
            email,
            password,
        } => bootstrap_admin(&config, &username, &email, &password).await,
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
    }
}

async fn connect_postgres(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("connecting to PostgreSQL")?;
    DatabaseManager::migrate(&pool).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

async fn serve(config: AppConfig, port: Option<u16>, kind: StoreKind, demo: bool) -> anyhow::Result<()> {
    let (store, blobs): (Arc<dyn Store>, Arc<dyn BlobStore>) = match kind {
        StoreKind::Postgres => (
            connect_postgres(&config).await?,
            Arc::new(FsBlobStore::new(config.storage.upload_dir.clone())),
        ),
        StoreKind::Memory => (Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new())),
    };

    if demo {
        if seed_demo(store.as_ref()).await?.is_some() {
            info!("Demo accounts use the password '{}'", DEMO_PASSWORD);
        }
    }

    let bind_addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(
        "Desk API listening on http://{} ({:?}, {:?} store)",
        bind_addr, config.environment, kind
    );

    let state = AppState::new(store, blobs, config);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Desk API stopped");
    Ok(())
}

async fn bootstrap_admin(config: &AppConfig, username: &str, email: &str, password: &str) -> anyhow::Result<()> {
    ensure!(
        password.chars().count() >= PASSWORD_MIN_CHARS,
        "password must be at least {} characters",
        PASSWORD_MIN_CHARS
    );
    ensure!(email.contains('@'), "a valid email is required");

    let store = connect_postgres(config).await?;
    if store.find_user_by_username(username).await?.is_some() {
        bail!("user '{}' already exists", username);
    }

    let user = store
        .insert_user(NewUser {
            username: username.to_string(),
            display_name: username.to_string(),
            email: email.to_lowercase(),
            password_hash: hash_password(password)?,
            role: Role::SuperAdmin,
            area_id: None,
            active: true,
        })
        .await?;

    info!("Created SuperAdministrador '{}' (id {})", user.username, user.id);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::try_parse_from(["desk-api", "serve", "--store", "memory", "--seed-demo", "--port", "9001"]).unwrap();
        match cli.command {
            Some(Commands::Serve { port, store, seed_demo }) => {
                assert_eq!(port, Some(9001));
                assert_eq!(store, StoreKind::Memory);
                assert!(seed_demo);
            }
            _ => panic!("expected serve"),
        }
    }
}
