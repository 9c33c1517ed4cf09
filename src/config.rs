//! Service configuration.
//!
//! The TOML document has two tables:
//! - `[general]` holds `db_path`, the connection descriptor. It is never cached; the
//!   store re-reads it through a [`DescriptorSource`] on every operation.
//! - `[server]` holds listener/logging/timeout settings, read once at startup.
//!
//! Any key can be overridden with `OPTOUT_<TABLE>__<KEY>` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

use crate::error::PrefsError;

/// Default location used by the web form service.
pub const DEFAULT_SERVER_CONFIG: &str = "/config.toml";
/// Default location used by the lookup CLI.
pub const DEFAULT_LOOKUP_CONFIG: &str = "/home/ec2-user/moziot/config/config.toml";

const DESCRIPTOR_KEY: &str = "general.db_path";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub loglevel: String,
    pub db_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:80".to_string(),
            loglevel: "info".to_string(),
            db_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: &Path) -> Figment {
        with_env(Figment::new().merge(Toml::file(path)))
    }
}

fn with_env(base: Figment) -> Figment {
    base.merge(Env::prefixed("OPTOUT_").split("__"))
}

/// Pull the connection descriptor out of a TOML document.
pub fn descriptor_from_toml(contents: &str) -> Result<String, PrefsError> {
    let descriptor = with_env(Figment::from(Toml::string(contents)))
        .extract_inner::<String>(DESCRIPTOR_KEY)?;
    Ok(descriptor)
}

/// Supplies the connection descriptor to the store, once per operation.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    async fn descriptor(&self) -> Result<String, PrefsError>;
}

/// Reads `general.db_path` from a TOML file on every call.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DescriptorSource for ConfigFile {
    async fn descriptor(&self) -> Result<String, PrefsError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        descriptor_from_toml(&contents)
    }
}

/// Fixed descriptor, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticDescriptor(pub String);

#[async_trait]
impl DescriptorSource for StaticDescriptor {
    async fn descriptor(&self) -> Result<String, PrefsError> {
        Ok(self.0.clone())
    }
}
