//! Lazily opened physical connection to a single resource.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use xa_bridge_core::{
    Credentials, ResourceHandle, Result, XaConnection, XaDataSource, XaError, XaResource,
};

/// Identifier used to correlate log lines of one connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerId(u64);

impl ManagerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcm-{}", self.0)
    }
}

struct OpenConnection {
    connection: Box<dyn XaConnection>,
    handle: ResourceHandle,
}

/// Owns at most one physical connection and opens it on demand.
///
/// Two call shapes are offered: [`with_held_connection`] for callers that
/// manage an explicit `connect`/`disconnect` window (recovery scans, an
/// active branch), and [`with_transient_connection`] for one-shot calls that
/// must not leave a connection behind.
///
/// [`with_held_connection`]: ResourceConnectionManager::with_held_connection
/// [`with_transient_connection`]: ResourceConnectionManager::with_transient_connection
pub struct ResourceConnectionManager {
    id: ManagerId,
    data_source: Arc<dyn XaDataSource>,
    credentials: Option<Credentials>,
    slot: Mutex<Option<OpenConnection>>,
}

impl ResourceConnectionManager {
    /// Creates a disconnected manager.
    ///
    /// Credentials that are not [valid](Credentials::is_valid) are dropped so
    /// the driver's credential-less connect is used.
    pub fn new(data_source: Arc<dyn XaDataSource>, credentials: Option<Credentials>) -> Self {
        Self {
            id: ManagerId::next(),
            data_source,
            credentials: credentials.filter(Credentials::is_valid),
            slot: Mutex::new(None),
        }
    }

    /// Returns this manager's identifier.
    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// Returns the credentials used to connect, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns true while a physical connection is open.
    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Opens the connection unless one is already open.
    ///
    /// On failure nothing stays open and the error is
    /// [`XaError::ResourceUnavailable`].
    pub fn connect(&self) -> Result<()> {
        let mut slot = self.lock();
        self.open(&mut slot)
    }

    /// Closes the connection. Close errors are logged and ignored.
    pub fn disconnect(&self) {
        let mut slot = self.lock();
        self.close(&mut slot);
    }

    /// Returns the capability handle of the open connection.
    pub fn resource_handle(&self) -> Result<ResourceHandle> {
        established(&self.lock()).map(|open| open.handle.clone())
    }

    /// Runs `op` against the already open connection without closing it.
    ///
    /// The connection stays locked while `op` runs, so a concurrent
    /// [`disconnect`](Self::disconnect) waits for it. `op` must not call back
    /// into this manager.
    pub fn with_held_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn XaResource) -> Result<T>,
    {
        let slot = self.lock();
        let open = established(&slot)?;
        op(open.handle.resource())
    }

    /// Runs `op` against the open physical connection.
    pub fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn XaConnection) -> Result<T>,
    {
        let slot = self.lock();
        let open = established(&slot)?;
        op(open.connection.as_ref())
    }

    /// Runs `op`, opening a connection first if needed.
    ///
    /// A connection opened by this call is closed before it returns, whatever
    /// `op` did. A connection that was already open is left open. The same
    /// locking rules as [`with_held_connection`](Self::with_held_connection)
    /// apply.
    pub fn with_transient_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn XaResource) -> Result<T>,
    {
        let mut slot = self.lock();
        if let Some(open) = slot.as_ref() {
            return op(open.handle.resource());
        }

        self.open(&mut slot)?;
        let guard = DisconnectGuard {
            manager: self,
            slot,
        };
        let open = established(&guard.slot)?;
        op(open.handle.resource())
    }

    fn open(&self, slot: &mut Option<OpenConnection>) -> Result<()> {
        if slot.is_some() {
            return Ok(());
        }

        tracing::debug!(
            manager = %self.id,
            with_credentials = self.credentials.is_some(),
            "opening resource connection"
        );

        let mut connection = self
            .data_source
            .connect(self.credentials.as_ref())
            .map_err(|e| XaError::unavailable("failed to open connection", e))?;

        match connection.xa_resource() {
            Ok(handle) => {
                *slot = Some(OpenConnection { connection, handle });
                tracing::debug!(manager = %self.id, "resource connection established");
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = connection.close() {
                    tracing::warn!(
                        manager = %self.id,
                        error = %close_err,
                        "failed to close partially opened connection"
                    );
                }
                Err(XaError::unavailable("failed to obtain XA resource", e))
            }
        }
    }

    fn close(&self, slot: &mut Option<OpenConnection>) {
        if let Some(mut open) = slot.take() {
            if let Err(e) = open.connection.close() {
                tracing::warn!(manager = %self.id, error = %e, "ignoring connection close failure");
            }
            tracing::debug!(manager = %self.id, "resource connection closed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenConnection>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResourceConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConnectionManager")
            .field("id", &self.id)
            .field("credentials", &self.credentials)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Drop for ResourceConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn established(slot: &Option<OpenConnection>) -> Result<&OpenConnection> {
    slot.as_ref()
        .ok_or_else(|| XaError::protocol("connection not established"))
}

/// Closes a connection opened for a single call, keeping the slot locked
/// until then.
struct DisconnectGuard<'a> {
    manager: &'a ResourceConnectionManager,
    slot: MutexGuard<'a, Option<OpenConnection>>,
}

impl Drop for DisconnectGuard<'_> {
    fn drop(&mut self) {
        self.manager.close(&mut self.slot);
    }
}
