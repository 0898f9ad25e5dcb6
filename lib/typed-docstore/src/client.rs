//! Connection lifecycle.
//!
//! One [`Connection`] per process. The first `get_connection` call builds it
//! from a [`Backend`] (rerouting to local emulators when configured); every
//! later call returns the same handle without touching the backend again.
//!
//! The check-then-create runs under a lock, so the "at most one connection"
//! guarantee holds with real threads, not just cooperative tasks.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    AuthService, Backend, BlobStorage, ClientConfig, CollectionRef, DocumentRef, DocumentStore,
    EmulatorOptions, Map, PassthroughConverter, Services,
};

pub const FIRESTORE_EMULATOR_HOST: &str = "localhost";
pub const FIRESTORE_EMULATOR_PORT: u16 = 8080;
pub const AUTH_EMULATOR_URL: &str = "http://localhost:9099";
pub const STORAGE_EMULATOR_HOST: &str = "localhost";
pub const STORAGE_EMULATOR_PORT: u16 = 9199;

struct ConnectionInner {
    config: ClientConfig,
    services: Services,
}

/// Handle to one initialized set of service clients.
///
/// Cloning is cheap and yields the same handle; compare with [`Connection::ptr_eq`].
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Initialize service clients from `backend`.
    ///
    /// With `config.use_emulators` set, the store, auth and blob storage
    /// clients are rerouted to their local emulators here, and only here.
    pub fn new(backend: &dyn Backend, config: &ClientConfig) -> Self {
        let services = backend.initialize(config);

        if config.use_emulators {
            info!("Connecting to emulators");
            services
                .store
                .connect_emulator(FIRESTORE_EMULATOR_HOST, FIRESTORE_EMULATOR_PORT);
            services.auth.connect_emulator(
                AUTH_EMULATOR_URL,
                EmulatorOptions {
                    disable_warnings: true,
                },
            );
            services
                .storage
                .connect_emulator(STORAGE_EMULATOR_HOST, STORAGE_EMULATOR_PORT);
        }

        debug!(project = %config.project_id, emulated = config.use_emulators, "connection created");
        Self {
            inner: Arc::new(ConnectionInner {
                config: config.clone(),
                services,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn is_emulated(&self) -> bool {
        self.inner.config.use_emulators
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.services.store
    }

    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.inner.services.auth
    }

    pub fn storage(&self) -> &Arc<dyn BlobStorage> {
        &self.inner.services.storage
    }

    /// True when both handles refer to the same initialized connection.
    pub fn ptr_eq(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Untyped view over `name`: writes are normalized, reads return raw maps.
    pub fn collection(&self, name: &str) -> CollectionRef<Map> {
        CollectionRef::new(name, self.store().clone(), Arc::new(PassthroughConverter))
    }

    /// Untyped reference to `name/id`.
    pub fn doc_ref(&self, name: &str, id: &str) -> DocumentRef<Map> {
        self.collection(name).doc(id)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("project_id", &self.inner.config.project_id)
            .field("emulated", &self.inner.config.use_emulators)
            .finish()
    }
}

/// Holder for the single live connection.
#[derive(Default)]
pub struct ClientRegistry {
    slot: Mutex<Option<Connection>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live connection, creating it on first use.
    ///
    /// `backend` and `config` are only consulted when no connection exists
    /// yet (including one injected with `set_connection`). The lock is held
    /// across `Backend::initialize`, so the backend must not re-enter this
    /// registry.
    pub fn get_or_init(&self, backend: &dyn Backend, config: &ClientConfig) -> Connection {
        let mut slot = self.slot.lock();
        if let Some(conn) = slot.as_ref() {
            debug!("reusing existing connection");
            return conn.clone();
        }

        let conn = Connection::new(backend, config);
        *slot = Some(conn.clone());
        conn
    }

    pub fn current(&self) -> Option<Connection> {
        self.slot.lock().clone()
    }

    /// Replace the live connection outright.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_connection(&self, conn: Connection) {
        *self.slot.lock() = Some(conn);
    }

    /// Drop the live connection so the next `get_or_init` creates a new one.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset(&self) {
        *self.slot.lock() = None;
    }
}

/// Process-wide registry backing the free functions below.
static GLOBAL: Lazy<ClientRegistry> = Lazy::new(ClientRegistry::new);

/// The process-wide connection, created on first call.
pub fn get_connection(backend: &dyn Backend, config: &ClientConfig) -> Connection {
    GLOBAL.get_or_init(backend, config)
}

/// The process-wide connection, if one has been created.
pub fn current_connection() -> Option<Connection> {
    GLOBAL.current()
}

/// Replace the process-wide connection.
#[cfg(any(test, feature = "test-utils"))]
pub fn set_connection(conn: Connection) {
    GLOBAL.set_connection(conn);
}

/// Forget the process-wide connection.
#[cfg(any(test, feature = "test-utils"))]
pub fn reset_connection() {
    GLOBAL.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stub::StubBackend;

    #[test]
    fn repeated_calls_return_the_same_handle() {
        let registry = ClientRegistry::new();
        let backend = StubBackend::new();
        let config = ClientConfig::new("p").with_emulators(true);

        let first = registry.get_or_init(&backend, &config);
        for _ in 0..5 {
            assert!(registry.get_or_init(&backend, &config).ptr_eq(&first));
        }
        assert_eq!(backend.init_count(), 1);
        assert_eq!(backend.store.emulator.lock().len(), 1);
        assert_eq!(backend.auth.emulator.lock().len(), 1);
        assert_eq!(backend.storage.emulator.lock().len(), 1);
    }

    #[test]
    fn emulator_endpoints_are_fixed() {
        let backend = StubBackend::new();
        let conn = Connection::new(&backend, &ClientConfig::new("p").with_emulators(true));
        assert!(conn.is_emulated());

        assert_eq!(
            backend.store.emulator.lock().as_slice(),
            &[("localhost".to_string(), 8080)]
        );
        assert_eq!(
            backend.auth.emulator.lock().as_slice(),
            &[(
                "http://localhost:9099".to_string(),
                EmulatorOptions {
                    disable_warnings: true
                }
            )]
        );
        assert_eq!(
            backend.storage.emulator.lock().as_slice(),
            &[("localhost".to_string(), 9199)]
        );
    }

    #[test]
    fn production_config_skips_rerouting() {
        let backend = StubBackend::new();
        let conn = Connection::new(&backend, &ClientConfig::new("p"));
        assert!(!conn.is_emulated());
        assert!(backend.store.emulator.lock().is_empty());
        assert!(backend.auth.emulator.lock().is_empty());
        assert!(backend.storage.emulator.lock().is_empty());
    }

    #[test]
    fn injected_connection_is_reused() {
        let registry = ClientRegistry::new();
        let injected_backend = StubBackend::new();
        let injected = Connection::new(&injected_backend, &ClientConfig::new("injected"));
        registry.set_connection(injected.clone());

        let backend = StubBackend::new();
        let conn = registry.get_or_init(&backend, &ClientConfig::new("other"));
        assert!(conn.ptr_eq(&injected));
        assert_eq!(conn.config().project_id, "injected");
        assert_eq!(backend.init_count(), 0);
    }

    #[test]
    fn reset_allows_a_fresh_connection() {
        let registry = ClientRegistry::new();
        let backend = StubBackend::new();
        let config = ClientConfig::new("p");

        let first = registry.get_or_init(&backend, &config);
        registry.reset();
        assert!(registry.current().is_none());
        let second = registry.get_or_init(&backend, &config);
        assert!(!second.ptr_eq(&first));
        assert_eq!(backend.init_count(), 2);
    }

    struct ObservingBackend {
        registry: Arc<ClientRegistry>,
        lock_held: std::sync::atomic::AtomicBool,
        inner: StubBackend,
    }

    impl Backend for ObservingBackend {
        fn initialize(&self, config: &ClientConfig) -> Services {
            let held = self.registry.slot.try_lock().is_none();
            self.lock_held
                .store(held, std::sync::atomic::Ordering::SeqCst);
            self.inner.initialize(config)
        }
    }

    #[test]
    fn initialize_runs_under_the_registry_lock() {
        let registry = Arc::new(ClientRegistry::new());
        let backend = ObservingBackend {
            registry: registry.clone(),
            lock_held: std::sync::atomic::AtomicBool::new(false),
            inner: StubBackend::new(),
        };

        registry.get_or_init(&backend, &ClientConfig::new("p"));
        assert!(backend.lock_held.load(std::sync::atomic::Ordering::SeqCst));
        assert!(registry.slot.try_lock().is_some());
    }

    #[test]
    fn concurrent_callers_share_one_connection() {
        let registry = Arc::new(ClientRegistry::new());
        let backend = Arc::new(StubBackend::new());
        let config = ClientConfig::new("p");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let backend = backend.clone();
                let config = config.clone();
                std::thread::spawn(move || registry.get_or_init(backend.as_ref(), &config))
            })
            .collect();

        let conns: Vec<Connection> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(conns.iter().all(|c| c.ptr_eq(&conns[0])));
        assert_eq!(backend.init_count(), 1);
    }
}
