//! Presents a local-only driver as an XA data source.

use std::fmt;
use std::sync::Arc;

use xa_bridge_core::{
    Credentials, DriverResult, LocalConnection, LocalDriver, ResourceHandle, XaConnection,
    XaDataSource,
};

use super::LastResourceAdapter;

/// An [`XaDataSource`] whose connections enlist as last resources.
pub struct LrcoDataSource {
    driver: Arc<dyn LocalDriver>,
}

impl LrcoDataSource {
    /// Creates a data source over `driver`.
    pub fn new(driver: Arc<dyn LocalDriver>) -> Self {
        Self { driver }
    }

    /// Opens a connection without going through the XA view.
    pub fn open(&self, credentials: Option<&Credentials>) -> DriverResult<LrcoConnection> {
        let physical = self.driver.connect(credentials)?;
        Ok(LrcoConnection::new(physical))
    }
}

impl XaDataSource for LrcoDataSource {
    fn connect(&self, credentials: Option<&Credentials>) -> DriverResult<Box<dyn XaConnection>> {
        Ok(Box::new(self.open(credentials)?))
    }
}

impl fmt::Debug for LrcoDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrcoDataSource").finish_non_exhaustive()
    }
}

/// A local connection paired with the one adapter that enlists it.
pub struct LrcoConnection {
    physical: Arc<dyn LocalConnection>,
    adapter: Arc<LastResourceAdapter>,
}

impl LrcoConnection {
    /// Wraps an open local connection.
    pub fn new(physical: Arc<dyn LocalConnection>) -> Self {
        let adapter = Arc::new(LastResourceAdapter::new(physical.clone()));
        Self { physical, adapter }
    }

    /// Returns the local connection for application work.
    pub fn physical(&self) -> &Arc<dyn LocalConnection> {
        &self.physical
    }

    /// Returns the adapter bound to this connection.
    pub fn adapter(&self) -> &Arc<LastResourceAdapter> {
        &self.adapter
    }
}

impl XaConnection for LrcoConnection {
    fn xa_resource(&self) -> DriverResult<ResourceHandle> {
        Ok(ResourceHandle::LastResource(self.adapter.clone()))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.physical.close()
    }

    fn local_connection(&self) -> Option<Arc<dyn LocalConnection>> {
        Some(self.physical.clone())
    }
}

impl fmt::Debug for LrcoConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrcoConnection")
            .field("adapter", &self.adapter)
            .finish()
    }
}
