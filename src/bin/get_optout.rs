use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use optout_prefs::config::DEFAULT_LOOKUP_CONFIG;
use optout_prefs::{OptOutStore, PreferenceStore};

/// Print whether an account has opted out: `True`, `False`, or `None`.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Account email address.
    email: String,

    /// TOML file holding `general.db_path`.
    #[arg(short, long, env = "OPTOUT_CONFIG", default_value = DEFAULT_LOOKUP_CONFIG)]
    config: PathBuf,

    /// Seconds to wait on connect and query.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    optout_prefs::logging::init("warn");

    let store =
        PreferenceStore::from_config_file(args.config, Duration::from_secs(args.timeout_secs));
    // Failures were already logged by the store; they print as `None`.
    let optout = store.get_opt_out(&args.email).await.ok().flatten();
    println!("{}", display_optout(optout));
}

fn display_optout(optout: Option<bool>) -> &'static str {
    match optout {
        Some(true) => "True",
        Some(false) => "False",
        None => "None",
    }
}
