use anyhow::{Context, Result};
use clap::Parser;
use discograph_server::catalog_store::{CatalogStore, SqliteCatalogStore};
use discograph_server::config::{AppConfig, CliConfig, FileConfig};
use discograph_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use discograph_server::user::{SqliteUserStore, UserStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the catalog.db and user.db SQLite files.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory for uploaded song audio and images. Defaults to db_dir.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Number of read-only SQLite connections for the catalog.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        media_path: cli_args.media_path,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        read_pool_size: cli_args.read_pool_size,
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    info!(
        "Opening SQLite catalog database at {:?}...",
        app_config.catalog_db_path()
    );
    let catalog_store = Arc::new(SqliteCatalogStore::new(
        app_config.catalog_db_path(),
        app_config.read_pool_size,
    )?);
    info!(
        "Catalog holds {} artists, {} albums, {} songs",
        catalog_store.get_artists_count(),
        catalog_store.get_albums_count(),
        catalog_store.get_songs_count(),
    );

    let user_store = SqliteUserStore::new(app_config.user_db_path())?;
    info!("{} users registered", user_store.get_users_count());

    info!("Ready to serve at port {}!", app_config.port);
    run_server(
        ServerConfig {
            requests_logging_level: app_config.logging_level,
            port: app_config.port,
            media_path: app_config.media_path,
        },
        catalog_store,
        Box::new(user_store),
    )
    .await
}
