//! Global and ephemeral database contexts
//!
//! [`ContextManager`] owns the process-wide pool behind an async mutex. Every
//! tool call resolves a [`DbContext`] through it: the global context when the
//! call targets the default database (or none), an ephemeral one bound to the
//! requested database otherwise. Ephemeral contexts close their pool when the
//! call ends.

use crate::config::DatabaseSettings;
use crate::connection::{PoolConnector, PoolSpec, close_pool};
use crate::error::DatabaseError;
use crate::validate::validate_database_name;
use sqlx::MySqlPool;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
struct GlobalState {
    pool: Option<MySqlPool>,
}

/// Pool handle paired with the database it targets
#[derive(Debug, Clone)]
pub struct Target {
    pool: MySqlPool,
    database: Option<String>,
}

impl Target {
    /// Database bound to the pool, `None` for a database-less connection
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub(crate) fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Global,
    Ephemeral,
}

/// A resolved context for one call
///
/// Ephemeral contexts must be handed back through [`DbContext::release`];
/// dropping one unreleased schedules the pool close on the runtime.
#[derive(Debug)]
pub struct DbContext {
    target: Target,
    kind: ContextKind,
    released: bool,
}

impl DbContext {
    fn new(pool: MySqlPool, database: Option<String>, kind: ContextKind) -> Self {
        Self {
            target: Target { pool, database },
            kind,
            released: false,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn database(&self) -> Option<&str> {
        self.target.database()
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn is_ephemeral(&self) -> bool {
        self.kind == ContextKind::Ephemeral
    }

    /// End the context, closing the pool if it is ephemeral
    pub async fn release(mut self) {
        self.released = true;
        if self.is_ephemeral() {
            if let Err(e) = close_pool(&self.target.pool).await {
                log::debug!("Ephemeral pool release: {}", e);
            } else {
                log::debug!(
                    "Released ephemeral context for {}",
                    self.target.database().unwrap_or("<none>")
                );
            }
        }
    }
}

impl Drop for DbContext {
    fn drop(&mut self) {
        if self.released || !self.is_ephemeral() || self.target.pool.is_closed() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.target.pool.clone();
                handle.spawn(async move { pool.close().await });
            }
            Err(_) => log::warn!("Ephemeral pool dropped outside a runtime, not closed"),
        }
    }
}

/// Owner of the global context
pub struct ContextManager {
    settings: Arc<DatabaseSettings>,
    connector: Arc<dyn PoolConnector>,
    /// Held while the global pool is created, swapped or closed
    state: Mutex<GlobalState>,
    /// Only written while `state` is held
    default_database: RwLock<Option<String>>,
}

impl ContextManager {
    pub fn new(settings: Arc<DatabaseSettings>, connector: Arc<dyn PoolConnector>) -> Self {
        let default_database = RwLock::new(settings.default_database.clone());
        Self {
            settings,
            connector,
            state: Mutex::new(GlobalState::default()),
            default_database,
        }
    }

    pub fn settings(&self) -> &Arc<DatabaseSettings> {
        &self.settings
    }

    /// Current default database
    pub async fn default_database(&self) -> Option<String> {
        self.default_database.read().await.clone()
    }

    /// Resolve the context for a call targeting `requested`
    ///
    /// Calls for another database only read the default and never wait on
    /// global pool creation or a pending switch.
    ///
    /// # Errors
    /// `InvalidIdentifier` for an unusable database name, `ConnectionError`
    /// when a pool has to be created and the server is unreachable. A failed
    /// global creation leaves no pool behind.
    pub async fn resolve(&self, requested: Option<&str>) -> Result<DbContext, DatabaseError> {
        let requested = requested.map(str::trim).filter(|db| !db.is_empty());
        if let Some(db) = requested {
            validate_database_name(db)?;
        }

        if let Some(db) = self.other_database(requested).await {
            return self.ephemeral(db).await;
        }

        let mut state = self.state.lock().await;
        // the default may have switched while waiting for the lock
        if let Some(db) = self.other_database(requested).await {
            drop(state);
            return self.ephemeral(db).await;
        }
        let default_database = self.default_database().await;

        let pool = match &state.pool {
            Some(pool) if !pool.is_closed() => pool.clone(),
            _ => {
                log::debug!(
                    "Creating global context for database {}",
                    default_database.as_deref().unwrap_or("<none>")
                );
                let spec = PoolSpec::global(&self.settings, default_database.as_deref());
                let pool = self.connector.connect(&spec).await?;
                state.pool = Some(pool.clone());
                pool
            }
        };

        Ok(DbContext::new(pool, default_database, ContextKind::Global))
    }

    /// `requested` when it names a database other than the default
    async fn other_database<'a>(&self, requested: Option<&'a str>) -> Option<&'a str> {
        let current = self.default_database.read().await;
        requested.filter(|db| current.as_deref() != Some(*db))
    }

    async fn ephemeral(&self, database: &str) -> Result<DbContext, DatabaseError> {
        log::debug!("Creating ephemeral context for database {}", database);
        let spec = PoolSpec::ephemeral(&self.settings, database);
        let pool = self.connector.connect(&spec).await?;
        Ok(DbContext::new(
            pool,
            Some(database.to_string()),
            ContextKind::Ephemeral,
        ))
    }

    /// Run `f` against the context for `requested`, releasing it afterwards
    ///
    /// The release happens on both success and failure of `f`.
    pub async fn scoped<T, F, Fut>(&self, requested: Option<&str>, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(Target) -> Fut,
        Fut: Future<Output = Result<T, DatabaseError>>,
    {
        let ctx = self.resolve(requested).await?;
        let result = f(ctx.target().clone()).await;
        ctx.release().await;
        result
    }

    /// Switch the default database
    ///
    /// The new pool is created and verified before the old one is replaced,
    /// so any failure leaves the previous default in place. Returns the
    /// previous default database.
    pub async fn change_default(&self, name: &str) -> Result<Option<String>, DatabaseError> {
        validate_database_name(name)?;

        let mut state = self.state.lock().await;
        let spec = PoolSpec::global(&self.settings, Some(name));
        let new_pool = self.connector.connect(&spec).await?;

        let verified = match self.connector.active_database(&new_pool).await {
            Ok(Some(active)) if active == name => Ok(()),
            Ok(active) => Err(DatabaseError::ConnectionError(format!(
                "Database switch not verified: expected {}, server reports {}",
                name,
                active.as_deref().unwrap_or("no database")
            ))),
            Err(e) => Err(e),
        };
        if let Err(e) = verified {
            new_pool.close().await;
            return Err(e);
        }

        let old_pool = state.pool.replace(new_pool);
        let previous = self.default_database.write().await.replace(name.to_string());
        drop(state);

        if let Some(old) = old_pool
            && let Err(e) = close_pool(&old).await
        {
            log::warn!("Closing previous global pool: {}", e);
        }

        log::info!(
            "Default database changed from {} to {}",
            previous.as_deref().unwrap_or("<none>"),
            name
        );
        Ok(previous)
    }

    /// Close the global pool if one is open
    ///
    /// A later call recreates the global context lazily.
    pub async fn close(&self) -> Result<(), DatabaseError> {
        let pool = self.state.lock().await.pool.take();
        match pool {
            Some(pool) => close_pool(&pool).await,
            None => {
                log::debug!("No global connection pool to close");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{PoolSettings, QueryTimeouts};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Connector producing lazily connecting pools, no server involved
    #[derive(Default)]
    pub(crate) struct FakeConnector {
        pub connects: AtomicUsize,
        pub fail: AtomicBool,
        pub misreport_database: AtomicBool,
        pub specs: std::sync::Mutex<Vec<PoolSpec>>,
        /// Connects to this database wait for `resume`
        pub stalled_database: std::sync::Mutex<Option<String>>,
        pub resume: tokio::sync::Notify,
    }

    impl FakeConnector {
        pub fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        pub fn last_spec(&self) -> Option<PoolSpec> {
            self.specs.lock().ok().and_then(|specs| specs.last().cloned())
        }

        pub fn stall(&self, database: &str) {
            if let Ok(mut stalled) = self.stalled_database.lock() {
                *stalled = Some(database.to_string());
            }
        }

        fn is_stalled(&self, spec: &PoolSpec) -> bool {
            self.stalled_database
                .lock()
                .is_ok_and(|stalled| stalled.is_some() && *stalled == spec.database)
        }
    }

    #[async_trait]
    impl PoolConnector for FakeConnector {
        async fn connect(&self, spec: &PoolSpec) -> Result<MySqlPool, DatabaseError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut specs) = self.specs.lock() {
                specs.push(spec.clone());
            }
            if self.is_stalled(spec) {
                self.resume.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(DatabaseError::ConnectionError(
                    "connection refused".to_string(),
                ));
            }
            Ok(spec
                .pool_options()
                .min_connections(0)
                .connect_lazy_with(spec.connect_options()))
        }

        async fn active_database(&self, pool: &MySqlPool) -> Result<Option<String>, DatabaseError> {
            if self.misreport_database.load(Ordering::SeqCst) {
                return Ok(Some("somewhere_else".to_string()));
            }
            Ok(pool.connect_options().get_database().map(str::to_string))
        }
    }

    pub(crate) fn test_settings(default_database: Option<&str>) -> DatabaseSettings {
        DatabaseSettings::new("127.0.0.1", 9, "tester", "pw")
            .with_default_database(default_database)
            .with_pool(PoolSettings {
                min_connections: 0,
                max_connections: 4,
                ephemeral_max_connections: 2,
                acquire_timeout: Duration::from_millis(200),
                ..PoolSettings::default()
            })
            .with_timeouts(QueryTimeouts {
                query: Duration::from_secs(1),
                metadata: Duration::from_secs(1),
                max_retries: 0,
                ..QueryTimeouts::default()
            })
    }

    pub(crate) fn manager(default_database: Option<&str>) -> (Arc<ContextManager>, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector::default());
        let manager = ContextManager::new(
            Arc::new(test_settings(default_database)),
            connector.clone(),
        );
        (Arc::new(manager), connector)
    }

    #[tokio::test]
    async fn global_context_is_created_once() {
        let (contexts, connector) = manager(None);

        let first = contexts.resolve(None).await.expect("first resolve");
        let second = contexts.resolve(None).await.expect("second resolve");

        assert_eq!(connector.connects(), 1);
        assert_eq!(first.kind(), ContextKind::Global);
        assert_eq!(second.database(), None);
        assert!(connector.last_spec().is_some_and(|s| s.database.is_none()));
    }

    #[tokio::test]
    async fn requesting_the_default_reuses_global() {
        let (contexts, connector) = manager(Some("shop"));

        let ctx = contexts.resolve(Some("shop")).await.expect("resolve");
        assert_eq!(ctx.kind(), ContextKind::Global);
        assert_eq!(ctx.database(), Some("shop"));

        let again = contexts.resolve(None).await.expect("resolve");
        assert_eq!(again.database(), Some("shop"));
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn other_database_gets_ephemeral_pool() {
        let (contexts, connector) = manager(Some("shop"));

        let ctx = contexts.resolve(Some("analytics")).await.expect("resolve");
        assert!(ctx.is_ephemeral());
        assert_eq!(ctx.database(), Some("analytics"));

        let spec = connector.last_spec().expect("spec recorded");
        assert_eq!(spec.max_connections, 2);
        assert_eq!(spec.database.as_deref(), Some("analytics"));

        let pool = ctx.target().pool().clone();
        ctx.release().await;
        assert!(pool.is_closed());
        assert_eq!(contexts.default_database().await.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn scoped_releases_ephemeral_on_error() {
        let (contexts, _connector) = manager(None);
        let seen = Arc::new(std::sync::Mutex::new(None));

        let slot = seen.clone();
        let result: Result<(), DatabaseError> = contexts
            .scoped(Some("analytics"), move |target| async move {
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(target.pool().clone());
                }
                Err(DatabaseError::QueryError("boom".to_string()))
            })
            .await;

        assert!(matches!(result, Err(DatabaseError::QueryError(_))));
        let pool = seen.lock().expect("lock").clone().expect("pool captured");
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn scoped_keeps_global_open() {
        let (contexts, _connector) = manager(None);

        let pool = contexts
            .scoped(None, |target| async move { Ok(target.pool().clone()) })
            .await
            .expect("scoped");

        assert!(!pool.is_closed());
    }

    #[tokio::test]
    async fn dropped_ephemeral_context_is_closed() {
        let (contexts, _connector) = manager(None);

        let ctx = contexts.resolve(Some("analytics")).await.expect("resolve");
        let pool = ctx.target().pool().clone();
        drop(ctx);

        for _ in 0..50 {
            if pool.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn failed_global_creation_leaves_no_state() {
        let (contexts, connector) = manager(None);
        connector.fail.store(true, Ordering::SeqCst);

        let result = contexts.resolve(None).await;
        assert!(matches!(result, Err(DatabaseError::ConnectionError(_))));

        connector.fail.store(false, Ordering::SeqCst);
        let ctx = contexts.resolve(None).await.expect("retry");
        assert_eq!(ctx.kind(), ContextKind::Global);
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_global_pool() {
        let (contexts, connector) = manager(Some("shop"));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let contexts = contexts.clone();
            handles.push(tokio::spawn(async move {
                contexts.resolve(None).await.map(|ctx| ctx.kind())
            }));
        }
        for handle in handles {
            let kind = handle.await.expect("join").expect("resolve");
            assert_eq!(kind, ContextKind::Global);
        }

        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn change_default_swaps_after_verification() {
        let (contexts, connector) = manager(None);
        let old = contexts.resolve(None).await.expect("resolve");
        let old_pool = old.target().pool().clone();

        let previous = contexts.change_default("analytics").await.expect("change");
        assert_eq!(previous, None);
        assert!(old_pool.is_closed());
        assert_eq!(contexts.default_database().await.as_deref(), Some("analytics"));

        let ctx = contexts.resolve(None).await.expect("resolve");
        assert_eq!(ctx.kind(), ContextKind::Global);
        assert_eq!(ctx.database(), Some("analytics"));
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn change_default_verification_failure_keeps_state() {
        let (contexts, connector) = manager(Some("shop"));
        let old = contexts.resolve(None).await.expect("resolve");
        let old_pool = old.target().pool().clone();

        connector.misreport_database.store(true, Ordering::SeqCst);
        let result = contexts.change_default("analytics").await;

        assert!(matches!(result, Err(DatabaseError::ConnectionError(_))));
        assert!(!old_pool.is_closed());
        assert_eq!(contexts.default_database().await.as_deref(), Some("shop"));

        let ctx = contexts.resolve(None).await.expect("resolve");
        assert_eq!(ctx.database(), Some("shop"));
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn change_default_connect_failure_keeps_state() {
        let (contexts, connector) = manager(Some("shop"));
        let _ = contexts.resolve(None).await.expect("resolve");

        connector.fail.store(true, Ordering::SeqCst);
        assert!(contexts.change_default("analytics").await.is_err());
        assert_eq!(contexts.default_database().await.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn change_default_rejects_unusable_name() {
        let (contexts, connector) = manager(None);

        for name in ["a".repeat(65), "shop\0".to_string(), "shop ".to_string()] {
            let result = contexts.change_default(&name).await;
            assert!(
                matches!(result, Err(DatabaseError::InvalidIdentifier(_))),
                "{:?} accepted",
                name
            );
        }
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn change_default_accepts_names_other_tools_accept() {
        let (contexts, connector) = manager(Some("shop"));

        let ctx = contexts.resolve(Some("my-db")).await.expect("resolve");
        assert!(ctx.is_ephemeral());
        ctx.release().await;

        let previous = contexts.change_default("my-db").await.expect("change");
        assert_eq!(previous.as_deref(), Some("shop"));
        assert_eq!(contexts.default_database().await.as_deref(), Some("my-db"));
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn resolve_rejects_unusable_name() {
        let (contexts, connector) = manager(None);

        let result = contexts.resolve(Some(&"a".repeat(65))).await;
        assert!(matches!(result, Err(DatabaseError::InvalidIdentifier(_))));
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn pending_switch_does_not_block_other_databases() {
        let (contexts, connector) = manager(Some("shop"));
        connector.stall("slow");

        let switching = {
            let contexts = contexts.clone();
            tokio::spawn(async move { contexts.change_default("slow").await })
        };
        while connector.connects() == 0 {
            tokio::task::yield_now().await;
        }

        let ctx = tokio::time::timeout(
            Duration::from_secs(1),
            contexts.resolve(Some("analytics")),
        )
        .await
        .expect("ephemeral resolve waited on the switch")
        .expect("resolve");
        assert!(ctx.is_ephemeral());
        ctx.release().await;

        connector.resume.notify_one();
        let previous = switching.await.expect("join").expect("switch");
        assert_eq!(previous.as_deref(), Some("shop"));
        assert_eq!(contexts.default_database().await.as_deref(), Some("slow"));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_global_recreates() {
        let (contexts, connector) = manager(None);

        assert!(contexts.close().await.is_ok());

        let ctx = contexts.resolve(None).await.expect("resolve");
        let pool = ctx.target().pool().clone();
        assert!(contexts.close().await.is_ok());
        assert!(pool.is_closed());
        assert!(contexts.close().await.is_ok());

        let ctx = contexts.resolve(None).await.expect("recreate");
        assert!(!ctx.target().pool().is_closed());
        assert_eq!(connector.connects(), 2);
    }
}
