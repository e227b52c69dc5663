//! Recovery helper for XA data sources.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use xa_bridge_core::xa::is_end_scan;
use xa_bridge_core::{
    same_object, Credentials, Result, XaDataSource, XaResource, XaResourceRecoveryHelper, Xid,
};

use crate::config::DEFAULT_RESOURCE_NAME;
use crate::connection::ResourceConnectionManager;
use crate::resource::NamedResource;

/// Exposes an XA data source to the recovery module.
///
/// The helper is itself the resource it hands out (wrapped under its name):
/// every XA call goes through its own connection manager, which is opened by
/// [`xa_resources`](XaResourceRecoveryHelper::xa_resources) and closed again
/// by `recover` with `XA_TMENDRSCAN`.
pub struct DataSourceRecoveryHelper {
    this: Weak<DataSourceRecoveryHelper>,
    connections: ResourceConnectionManager,
    name: String,
}

impl DataSourceRecoveryHelper {
    /// Creates a helper.
    ///
    /// `credentials` are used for recovery connections when valid; `name`
    /// defaults to `"dataSource"`.
    pub fn new(
        data_source: Arc<dyn XaDataSource>,
        credentials: Option<Credentials>,
        name: Option<String>,
    ) -> Arc<Self> {
        let name = name.unwrap_or_else(|| DEFAULT_RESOURCE_NAME.to_string());
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            connections: ResourceConnectionManager::new(data_source, credentials),
            name,
        })
    }

    /// Returns the name attached to the resources this helper hands out.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while a recovery connection is open.
    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    /// Returns the connection manager backing this helper.
    pub fn connections(&self) -> &ResourceConnectionManager {
        &self.connections
    }
}

impl XaResourceRecoveryHelper for DataSourceRecoveryHelper {
    fn initialise(&self, _config: &str) -> bool {
        true
    }

    fn xa_resources(&self) -> Vec<Arc<dyn XaResource>> {
        if let Err(e) = self.connections.connect() {
            tracing::warn!(
                resource = %self.name,
                error = %e,
                "recovery connection unavailable, skipping this pass"
            );
            return Vec::new();
        }

        match self.this.upgrade() {
            Some(this) => {
                let this: Arc<dyn XaResource> = this;
                vec![Arc::new(NamedResource::new(this, self.name.clone()))]
            }
            None => Vec::new(),
        }
    }
}

impl XaResource for DataSourceRecoveryHelper {
    fn start(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.connections.with_held_connection(|r| r.start(xid, flags))
    }

    fn end(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.connections.with_held_connection(|r| r.end(xid, flags))
    }

    fn prepare(&self, xid: &Xid) -> Result<i32> {
        self.connections.with_held_connection(|r| r.prepare(xid))
    }

    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<()> {
        self.connections
            .with_held_connection(|r| r.commit(xid, one_phase))
    }

    fn rollback(&self, xid: &Xid) -> Result<()> {
        self.connections.with_held_connection(|r| r.rollback(xid))
    }

    fn forget(&self, xid: &Xid) -> Result<()> {
        self.connections.with_held_connection(|r| r.forget(xid))
    }

    fn recover(&self, flags: i32) -> Result<Vec<Xid>> {
        let result = self.connections.with_held_connection(|r| r.recover(flags));
        if is_end_scan(flags) {
            self.connections.disconnect();
            tracing::debug!(resource = %self.name, "recovery scan finished");
        }
        result
    }

    fn transaction_timeout(&self) -> Result<Duration> {
        self.connections
            .with_held_connection(|r| r.transaction_timeout())
    }

    fn set_transaction_timeout(&self, timeout: Duration) -> Result<bool> {
        self.connections
            .with_held_connection(|r| r.set_transaction_timeout(timeout))
    }

    fn is_same_rm(&self, other: &dyn XaResource) -> Result<bool> {
        if same_object(self, other) {
            return Ok(true);
        }
        self.connections.with_held_connection(|r| r.is_same_rm(other))
    }
}

impl fmt::Debug for DataSourceRecoveryHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceRecoveryHelper")
            .field("name", &self.name)
            .field("connections", &self.connections)
            .finish()
    }
}
