//! Connection enlisted in a global transaction.

use std::fmt;
use std::sync::Arc;

use xa_bridge_core::{LocalConnection, Result, XaConnection, XaError, XaResource};

use super::ResourceConnectionManager;
use crate::resource::EnlistedResource;
use crate::transaction::{Synchronization, Transaction, TransactionStatus};

/// A physical connection whose resource is enlisted in a transaction.
///
/// The physical connection outlives [`close`](Self::close) and drop until
/// the transaction completes, so the coordinator can still drive the branch
/// through it.
pub struct TransactionalConnection {
    connections: Arc<ResourceConnectionManager>,
    resource: EnlistedResource,
    transaction: Arc<dyn Transaction>,
}

impl TransactionalConnection {
    /// Opens a connection through `connections` and enlists its resource,
    /// named `name`, in `transaction`.
    ///
    /// With `last_resource` set, a native XA resource is enlisted as a
    /// commit-last resource. The connection is released again if enlistment
    /// fails.
    pub(crate) fn enlist(
        connections: ResourceConnectionManager,
        transaction: Arc<dyn Transaction>,
        name: &str,
        last_resource: bool,
    ) -> Result<Self> {
        let connections = Arc::new(connections);
        connections.connect()?;
        let handle = connections.resource_handle()?;

        let mut resource = EnlistedResource::from(handle);
        if last_resource && !resource.commits_last() {
            tracing::debug!(
                manager = %connections.id(),
                name = %name,
                "enlisting XA resource as last resource"
            );
            resource = resource.commit_last();
        }
        let resource = resource.named(name);

        let release = Arc::new(ReleaseOnCompletion {
            connections: connections.clone(),
        });
        if let Err(e) = transaction.register_synchronization(release) {
            connections.disconnect();
            return Err(e);
        }

        match transaction.enlist_resource(resource.clone()) {
            Ok(true) => {}
            Ok(false) => {
                connections.disconnect();
                return Err(XaError::IllegalState(format!(
                    "transaction refused to enlist resource {}",
                    name
                )));
            }
            Err(e) => {
                connections.disconnect();
                return Err(e);
            }
        }

        tracing::debug!(
            manager = %connections.id(),
            name = %name,
            kind = resource.kind(),
            "resource enlisted"
        );

        Ok(Self {
            connections,
            resource,
            transaction,
        })
    }

    /// Returns the resource as enlisted.
    pub fn resource(&self) -> &EnlistedResource {
        &self.resource
    }

    /// Returns the transaction the resource is enlisted in.
    pub fn transaction(&self) -> &Arc<dyn Transaction> {
        &self.transaction
    }

    /// Runs `op` against the enlisted resource.
    pub fn with_resource<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn XaResource) -> Result<T>,
    {
        self.connections.with_held_connection(op)
    }

    /// Runs `op` against the physical connection, for application work.
    ///
    /// Fails with [`XaError::Protocol`] once the connection is released.
    pub fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn XaConnection) -> Result<T>,
    {
        self.connections.with_connection(op)
    }

    /// Returns the local connection behind a commit-last local resource.
    ///
    /// `None` for native XA connections and once the connection is released.
    pub fn local_connection(&self) -> Option<Arc<dyn LocalConnection>> {
        self.connections
            .with_connection(|connection| Ok(connection.local_connection()))
            .ok()
            .flatten()
    }

    /// Dissociates the resource from the transaction.
    pub fn delist(&self, flags: i32) -> Result<bool> {
        self.transaction
            .delist_resource(self.resource.clone(), flags)
    }

    /// Returns true until the physical connection is released.
    pub fn is_open(&self) -> bool {
        self.connections.is_connected()
    }

    /// Releases the physical connection. Calling it again has no effect.
    ///
    /// While the transaction has not completed, release is left to its
    /// completion.
    pub fn close(&self) {
        match self.transaction.status() {
            Ok(status) if status.is_completed() || status == TransactionStatus::NoTransaction => {
                self.connections.disconnect();
            }
            Ok(status) => {
                tracing::debug!(
                    manager = %self.connections.id(),
                    status = %status,
                    "transaction not completed, connection released on completion"
                );
            }
            Err(e) => {
                tracing::warn!(
                    manager = %self.connections.id(),
                    error = %e,
                    "transaction status unavailable, connection released on completion"
                );
            }
        }
    }
}

impl fmt::Debug for TransactionalConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionalConnection")
            .field("connections", &self.connections)
            .field("resource", &self.resource)
            .finish()
    }
}

/// Releases an enlisted connection once its transaction completes.
struct ReleaseOnCompletion {
    connections: Arc<ResourceConnectionManager>,
}

impl Synchronization for ReleaseOnCompletion {
    fn before_completion(&self) {}

    fn after_completion(&self, status: TransactionStatus) {
        tracing::debug!(
            manager = %self.connections.id(),
            status = %status,
            "releasing enlisted connection"
        );
        self.connections.disconnect();
    }
}
