pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod server;

pub use db::store::{OptOutStore, PreferenceStore};
pub use error::PrefsError;
