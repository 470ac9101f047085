use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use schemavault::cli::{DEFAULT_SERVER_URL, init_store, run_get, run_upload, run_versions};
use schemavault::config::ServerConfig;
use schemavault::server::{AppState, create_router};

#[derive(Parser)]
#[command(name = "schemavault")]
#[command(about = "A versioned registry for OpenAPI, JSON and YAML schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// TOML config file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the catalog database and schema files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Upload a schema document as the next version of its scope
    #[command(alias = "import")]
    Upload {
        /// Path to the OpenAPI/JSON/YAML file
        #[arg(long, short)]
        spec: PathBuf,

        /// Application name
        #[arg(long, short)]
        application: String,

        /// Service name within the application
        #[arg(long)]
        service: Option<String>,

        /// Registry server URL
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },

    /// Fetch a schema document
    Get {
        /// Application name
        #[arg(long, short)]
        application: String,

        /// Service name within the application
        #[arg(long)]
        service: Option<String>,

        /// Version to fetch: "latest" or a number
        #[arg(long = "schema-version", short = 'v', default_value = "latest")]
        version: String,

        /// Write the document to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Registry server URL
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },

    /// List the versions of a scope, newest first
    Versions {
        /// Application name
        #[arg(long, short)]
        application: String,

        /// Service name within the application
        #[arg(long)]
        service: Option<String>,

        /// Registry server URL
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
}

async fn run_serve(
    config_file: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config_file {
        Some(path) => ServerConfig::from_file(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    let store = init_store(&config)?;
    info!("Catalog database at {}", config.db_path().display());

    let state = Arc::new(AppState::new(Arc::new(store), &config.schemas_dir()));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("schemavault=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => {
            run_serve(config, host, port, data_dir).await?;
        }
        // The blocking HTTP client must not run on a runtime worker thread.
        Commands::Upload {
            spec,
            application,
            service,
            server,
        } => {
            tokio::task::spawn_blocking(move || {
                run_upload(&spec, &application, service.as_deref(), &server)
            })
            .await??;
        }
        Commands::Get {
            application,
            service,
            version,
            output,
            server,
        } => {
            tokio::task::spawn_blocking(move || {
                run_get(&application, service.as_deref(), &version, output, &server)
            })
            .await??;
        }
        Commands::Versions {
            application,
            service,
            server,
        } => {
            tokio::task::spawn_blocking(move || {
                run_versions(&application, service.as_deref(), &server)
            })
            .await??;
        }
    }

    Ok(())
}
