use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{ConfigFile, DescriptorSource};
use crate::db::descriptor::resolve;
use crate::db::driver::{AccountsConnection, Driver, SchemeDriver};
use crate::error::PrefsError;

/// Read/write access to the opt-out flag of an account.
#[async_trait]
pub trait OptOutStore: Send + Sync {
    /// `Ok(None)` when no account matches `email`.
    async fn get_opt_out(&self, email: &str) -> Result<Option<bool>, PrefsError>;

    /// Succeeds even when no account matches, so callers cannot probe for accounts.
    async fn set_opt_out(&self, email: &str, optout: bool) -> Result<(), PrefsError>;
}

/// Opt-out store that re-reads the descriptor and opens a fresh connection for
/// every operation, closing it before returning.
#[derive(Clone)]
pub struct PreferenceStore {
    source: Arc<dyn DescriptorSource>,
    driver: Arc<dyn Driver>,
    timeout: Duration,
}

impl PreferenceStore {
    pub fn new(
        source: impl DescriptorSource + 'static,
        driver: impl Driver + 'static,
        timeout: Duration,
    ) -> Self {
        Self {
            source: Arc::new(source),
            driver: Arc::new(driver),
            timeout,
        }
    }

    /// Store backed by a TOML config file, choosing the driver from the descriptor scheme.
    pub fn from_config_file(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(ConfigFile::new(path), SchemeDriver, timeout)
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = Result<T, PrefsError>>,
    ) -> Result<T, PrefsError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| PrefsError::Timeout(stage))?
    }

    async fn connect(&self) -> Result<Box<dyn AccountsConnection>, PrefsError> {
        let descriptor = self.source.descriptor().await?;
        let target = resolve(&descriptor)?;
        self.bounded("connect", self.driver.open(&target)).await
    }

    async fn release(&self, conn: Box<dyn AccountsConnection>) {
        if let Err(e) = self.bounded("close", conn.close()).await {
            warn!(error = %e, "failed to close database connection");
        }
    }

    async fn lookup(&self, email: &str) -> Result<Option<bool>, PrefsError> {
        let mut conn = self.connect().await?;
        let row = self.bounded("query", conn.select_optout(email)).await;
        self.release(conn).await;
        Ok(row?.map(|optout| optout != 0))
    }

    async fn update(&self, email: &str, optout: bool) -> Result<(), PrefsError> {
        let mut conn = self.connect().await?;
        let flag = if optout { 1 } else { 0 };
        let updated = self.bounded("update", conn.update_optout(email, flag)).await;
        self.release(conn).await;
        let rows_affected = updated?;
        debug!(rows_affected, optout, "opt-out update applied");
        Ok(())
    }
}

#[async_trait]
impl OptOutStore for PreferenceStore {
    async fn get_opt_out(&self, email: &str) -> Result<Option<bool>, PrefsError> {
        self.lookup(email).await.inspect_err(|e| {
            warn!(email, kind = e.kind(), error = %e, "opt-out lookup failed");
        })
    }

    async fn set_opt_out(&self, email: &str, optout: bool) -> Result<(), PrefsError> {
        self.update(email, optout).await.inspect_err(|e| {
            warn!(email, optout, kind = e.kind(), error = %e, "opt-out update failed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticDescriptor;
    use crate::db::descriptor::ConnectionTarget;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Fault {
        None,
        Connect,
        Query,
        Hang,
        CloseFails,
        CloseHangs,
    }

    /// In-memory accounts table that counts connection lifecycles.
    struct FakeDriver {
        rows: Arc<Mutex<HashMap<String, i64>>>,
        counters: Arc<Counters>,
        fault: Fault,
    }

    struct FakeConnection {
        rows: Arc<Mutex<HashMap<String, i64>>>,
        counters: Arc<Counters>,
        fault: Fault,
    }

    #[async_trait]
    impl Driver for FakeDriver {
        async fn open(
            &self,
            _target: &ConnectionTarget,
        ) -> Result<Box<dyn AccountsConnection>, PrefsError> {
            if self.fault == Fault::Connect {
                return Err(PrefsError::Connection(sqlx::Error::PoolTimedOut));
            }
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeConnection {
                rows: self.rows.clone(),
                counters: self.counters.clone(),
                fault: self.fault,
            }))
        }
    }

    impl FakeConnection {
        fn read(&self, email: &str) -> Option<i64> {
            self.rows.lock().unwrap().get(email).copied()
        }

        fn write(&self, email: &str, optout: i64) -> u64 {
            match self.rows.lock().unwrap().get_mut(email) {
                Some(v) => {
                    *v = optout;
                    1
                }
                None => 0,
            }
        }
    }

    #[async_trait]
    impl AccountsConnection for FakeConnection {
        async fn select_optout(&mut self, email: &str) -> Result<Option<i64>, PrefsError> {
            match self.fault {
                Fault::Query => Err(PrefsError::Query(sqlx::Error::RowNotFound)),
                Fault::Hang => std::future::pending().await,
                _ => Ok(self.read(email)),
            }
        }

        async fn update_optout(&mut self, email: &str, optout: i64) -> Result<u64, PrefsError> {
            match self.fault {
                Fault::Query => Err(PrefsError::Query(sqlx::Error::RowNotFound)),
                Fault::Hang => std::future::pending().await,
                _ => Ok(self.write(email, optout)),
            }
        }

        async fn close(self: Box<Self>) -> Result<(), PrefsError> {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            match self.fault {
                Fault::CloseFails => Err(PrefsError::Connection(sqlx::Error::PoolClosed)),
                Fault::CloseHangs => std::future::pending().await,
                _ => Ok(()),
            }
        }
    }

    fn store_with(fault: Fault, descriptor: &str) -> (PreferenceStore, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let rows = Arc::new(Mutex::new(HashMap::from([
            ("alice@example.com".to_string(), 0),
            ("bob@example.com".to_string(), 1),
        ])));
        let driver = FakeDriver {
            rows,
            counters: counters.clone(),
            fault,
        };
        let store = PreferenceStore::new(
            StaticDescriptor(descriptor.to_string()),
            driver,
            Duration::from_millis(200),
        );
        (store, counters)
    }

    const GOOD: &str = "mysql://u:p@h/d";

    #[tokio::test]
    async fn lookup_maps_nonzero_to_opted_out() {
        let (store, counters) = store_with(Fault::None, GOOD);
        assert_eq!(store.get_opt_out("alice@example.com").await.unwrap(), Some(false));
        assert_eq!(store.get_opt_out("bob@example.com").await.unwrap(), Some(true));
        assert_eq!(store.get_opt_out("nobody@example.com").await.unwrap(), None);
        assert_eq!(counters.opens.load(Ordering::SeqCst), 3);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (store, _) = store_with(Fault::None, GOOD);
        for value in [true, false, true] {
            store.set_opt_out("alice@example.com", value).await.unwrap();
            assert_eq!(store.get_opt_out("alice@example.com").await.unwrap(), Some(value));
        }
    }

    #[tokio::test]
    async fn update_of_unknown_email_is_acknowledged() {
        let (store, _) = store_with(Fault::None, GOOD);
        store.set_opt_out("ghost@example.com", true).await.unwrap();
        assert_eq!(store.get_opt_out("ghost@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn query_failure_still_closes_connection() {
        let (store, counters) = store_with(Fault::Query, GOOD);
        let err = store.get_opt_out("alice@example.com").await.unwrap_err();
        assert!(matches!(err, PrefsError::Query(_)));
        let err = store.set_opt_out("alice@example.com", true).await.unwrap_err();
        assert!(matches!(err, PrefsError::Query(_)));
        assert_eq!(counters.opens.load(Ordering::SeqCst), 2);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hung_query_times_out_and_closes() {
        let (store, counters) = store_with(Fault::Hang, GOOD);
        let err = store.get_opt_out("alice@example.com").await.unwrap_err();
        assert!(matches!(err, PrefsError::Timeout("query")));
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let (store, counters) = store_with(Fault::Connect, GOOD);
        let err = store.set_opt_out("alice@example.com", true).await.unwrap_err();
        assert!(matches!(err, PrefsError::Connection(_)));
        assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_descriptor_never_connects() {
        let (store, counters) = store_with(Fault::None, "mysql://no-credentials-here");
        let err = store.get_opt_out("alice@example.com").await.unwrap_err();
        assert!(matches!(err, PrefsError::Config(_)));
        assert_eq!(counters.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn close_failure_does_not_override_result() {
        let (store, counters) = store_with(Fault::CloseFails, GOOD);
        assert_eq!(store.get_opt_out("bob@example.com").await.unwrap(), Some(true));
        store.set_opt_out("alice@example.com", true).await.unwrap();
        assert_eq!(store.get_opt_out("alice@example.com").await.unwrap(), Some(true));
        assert_eq!(counters.closes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn hung_close_times_out_without_failing_operation() {
        let (store, counters) = store_with(Fault::CloseHangs, GOOD);
        assert_eq!(store.get_opt_out("alice@example.com").await.unwrap(), Some(false));
        store.set_opt_out("ghost@example.com", false).await.unwrap();
        assert_eq!(counters.closes.load(Ordering::SeqCst), 2);
    }
}
