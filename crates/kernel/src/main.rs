//! Quill blog CMS kernel
//!
//! HTTP server, plugin host, and maintenance commands.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use axum::http::{HeaderValue, Method};
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use quill_kernel::config::Config;
use quill_kernel::plugin::cli;
use quill_kernel::routes;
use quill_kernel::state::AppState;
use quill_kernel::storage::PgStorage;

#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Quill blog CMS", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// List installed and discovered plugins
    List,

    /// Show the enabled plugins in load order
    LoadOrder,

    /// Install a plugin from a directory containing plugin.toml
    Install {
        /// Plugin directory or manifest file
        path: PathBuf,
    },

    /// Enable an installed plugin
    Enable { name: String },

    /// Disable an installed plugin
    Disable { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(&config).await,
        Command::Plugin { command } => run_plugin_command(&config, command).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Quill");
    info!(port = config.port, "Configuration loaded");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    info!(
        storage = state.storage().backend(),
        handlers = ?state.plugins().host().handler_names(),
        "Storage and plugins ready"
    );

    let app = routes::router(state)
        .layer(build_cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn migrate(config: &Config) -> Result<()> {
    if config.database_url.is_none() {
        bail!("DATABASE_URL must be set to run migrations");
    }
    let storage = PgStorage::connect(config).await?;
    storage.migrate().await?;
    println!("Migrations applied.");
    Ok(())
}

async fn run_plugin_command(config: &Config, command: PluginCommand) -> Result<()> {
    if config.database_url.is_none() {
        warn!("DATABASE_URL not set; plugin changes will not be persisted");
    }
    let state = AppState::new(config)
        .await
        .context("failed to initialize application state")?;
    let service = state.plugins();

    match command {
        PluginCommand::List => cli::cmd_plugin_list(service, state.plugins_dir()).await,
        PluginCommand::LoadOrder => cli::cmd_plugin_load_order(service).await,
        PluginCommand::Install { path } => cli::cmd_plugin_install(service, &path).await,
        PluginCommand::Enable { name } => cli::cmd_plugin_enable(service, &name).await,
        PluginCommand::Disable { name } => cli::cmd_plugin_disable(service, &name).await,
    }
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
