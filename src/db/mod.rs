//! Data access for the opt-out preference.
//!
//! Layout:
//! - `descriptor.rs`: connection descriptor parsing
//! - `driver.rs`: one-shot connections to MySQL or SQLite
//! - `schema.rs`: the two statements plus SQLite DDL
//! - `store.rs`: `PreferenceStore`, one connection per operation

pub mod descriptor;
pub mod driver;
pub mod schema;
pub mod store;

pub use descriptor::{ConnectionTarget, resolve};
pub use driver::{AccountsConnection, Driver, MySqlDriver, SchemeDriver, SqliteDriver};
pub use schema::SQLITE_ACCOUNTS_INIT;
pub use store::{OptOutStore, PreferenceStore};
