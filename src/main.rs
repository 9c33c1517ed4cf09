use std::path::PathBuf;

use clap::Parser;
use mimalloc::MiMalloc;
use optout_prefs::PreferenceStore;
use optout_prefs::config::{Config, DEFAULT_SERVER_CONFIG};
use optout_prefs::server::{PrefsState, prefs_router};
use tokio::net::TcpListener;
use tracing::info;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Public web form for changing an account's email subscription preference.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// TOML file holding `general.db_path` and optional `[server]` settings.
    #[arg(short, long, env = "OPTOUT_CONFIG", default_value = DEFAULT_SERVER_CONFIG)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let cfg = Config::load(&args.config)?;
    optout_prefs::logging::init(&cfg.server.loglevel);

    info!(
        config = %args.config.display(),
        listen_addr = %cfg.server.listen_addr,
        loglevel = %cfg.server.loglevel,
        db_timeout_secs = cfg.server.db_timeout_secs
    );

    // The descriptor is re-read from the config file on every store call.
    let store = PreferenceStore::from_config_file(args.config.clone(), cfg.server.db_timeout());
    let app = prefs_router(PrefsState::new(store));

    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.server.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
