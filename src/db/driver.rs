use async_trait::async_trait;
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};

use crate::db::descriptor::ConnectionTarget;
use crate::db::schema::{SELECT_OPTOUT, UPDATE_OPTOUT};
use crate::error::PrefsError;

/// Opens one connection to the accounts store.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn open(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn AccountsConnection>, PrefsError>;
}

/// A single open connection. Callers must `close` it on every exit path.
#[async_trait]
pub trait AccountsConnection: Send {
    /// Raw `optout` column for `email`, or `None` when no row matches.
    async fn select_optout(&mut self, email: &str) -> Result<Option<i64>, PrefsError>;

    /// Set `optout` for `email`; returns rows affected.
    async fn update_optout(&mut self, email: &str, optout: i64) -> Result<u64, PrefsError>;

    async fn close(self: Box<Self>) -> Result<(), PrefsError>;
}

macro_rules! impl_accounts_connection {
    ($conn:ty) => {
        #[async_trait]
        impl AccountsConnection for $conn {
            async fn select_optout(&mut self, email: &str) -> Result<Option<i64>, PrefsError> {
                sqlx::query_scalar::<_, i64>(SELECT_OPTOUT)
                    .bind(email)
                    .fetch_optional(&mut *self)
                    .await
                    .map_err(PrefsError::Query)
            }

            async fn update_optout(&mut self, email: &str, optout: i64) -> Result<u64, PrefsError> {
                let result = sqlx::query(UPDATE_OPTOUT)
                    .bind(optout)
                    .bind(email)
                    .execute(&mut *self)
                    .await
                    .map_err(PrefsError::Query)?;
                Ok(result.rows_affected())
            }

            async fn close(self: Box<Self>) -> Result<(), PrefsError> {
                Connection::close(*self).await.map_err(PrefsError::Connection)
            }
        }
    };
}

impl_accounts_connection!(MySqlConnection);
impl_accounts_connection!(SqliteConnection);

/// MySQL/MariaDB, the production store.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

#[async_trait]
impl Driver for MySqlDriver {
    async fn open(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn AccountsConnection>, PrefsError> {
        let conn = MySqlConnection::connect_with(&mysql_options(target))
            .await
            .map_err(PrefsError::Connection)?;
        Ok(Box::new(conn))
    }
}

fn mysql_options(target: &ConnectionTarget) -> MySqlConnectOptions {
    let (host, port) = split_port(&target.host);
    let opts = MySqlConnectOptions::new()
        .host(host)
        .username(&target.user)
        .password(&target.password)
        .database(&target.database);
    match port {
        Some(port) => opts.port(port),
        None => opts,
    }
}

fn split_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((name, port)) => match port.parse() {
            Ok(port) => (name, Some(port)),
            Err(_) => (host, None),
        },
        None => (host, None),
    }
}

/// SQLite file store; the database segment of the descriptor is the file path.
/// User, password and host are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

#[async_trait]
impl Driver for SqliteDriver {
    async fn open(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn AccountsConnection>, PrefsError> {
        let opts = SqliteConnectOptions::new()
            .filename(&target.database)
            .create_if_missing(false);
        let conn = SqliteConnection::connect_with(&opts)
            .await
            .map_err(PrefsError::Connection)?;
        Ok(Box::new(conn))
    }
}

/// Picks SQLite for the `sqlite` scheme and MySQL for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemeDriver;

#[async_trait]
impl Driver for SchemeDriver {
    async fn open(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn AccountsConnection>, PrefsError> {
        if target.scheme.eq_ignore_ascii_case("sqlite") {
            SqliteDriver.open(target).await
        } else {
            MySqlDriver.open(target).await
        }
    }
}
