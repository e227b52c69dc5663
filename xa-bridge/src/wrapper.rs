//! Wrapping data sources for transactions and recovery.
//!
//! Wrapping a data source registers a recovery helper for it and returns a
//! handle that opens enlisted connections:
//!
//! ```ignore
//! let wrapper = XaResourceWrapper::new(recovery_module, ResourceConfig::builder()
//!     .name("orders")
//!     .build()?);
//! let orders = wrapper.wrap(data_source)?;
//!
//! let tx = transaction_manager.transaction()?.expect("transaction");
//! let connection = orders.connection(&tx)?;
//! // ... application work, then the coordinator completes `tx` ...
//! connection.close();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use xa_bridge_core::{LocalDriver, Result, XaDataSource, XaError, XaResourceRecoveryHelper};

use crate::config::ResourceConfig;
use crate::connection::{ResourceConnectionManager, TransactionalConnection};
use crate::lrco::LrcoDataSource;
use crate::recovery::{DataSourceRecoveryHelper, RecoveryModule};
use crate::transaction::Transaction;

/// Wraps data sources according to one [`ResourceConfig`].
pub struct XaResourceWrapper {
    recovery_module: Arc<dyn RecoveryModule>,
    config: ResourceConfig,
}

impl XaResourceWrapper {
    /// Creates a wrapper registering helpers with `recovery_module`.
    pub fn new(recovery_module: Arc<dyn RecoveryModule>, config: ResourceConfig) -> Self {
        Self {
            recovery_module,
            config,
        }
    }

    /// Returns the configuration applied to wrapped data sources.
    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Wraps an XA data source.
    ///
    /// # Errors
    ///
    /// With `verify_on_wrap` set, fails with [`XaError::ResourceUnavailable`]
    /// when the resource cannot be reached. Nothing is registered then.
    pub fn wrap(&self, data_source: Arc<dyn XaDataSource>) -> Result<WrappedResource> {
        let credentials = self.config.recovery_credentials().cloned();

        if self.config.verify_on_wrap() {
            ResourceConnectionManager::new(data_source.clone(), credentials.clone())
                .with_transient_connection(|_| Ok(()))?;
        }

        let helper = DataSourceRecoveryHelper::new(
            data_source.clone(),
            credentials,
            Some(self.config.name().to_string()),
        );
        let registered: Arc<dyn XaResourceRecoveryHelper> = helper.clone();
        self.recovery_module.add_recovery_helper(registered.clone());

        tracing::info!(
            name = %self.config.name(),
            last_resource = self.config.is_last_resource(),
            "resource wrapped and registered for recovery"
        );

        Ok(WrappedResource {
            data_source,
            config: self.config.clone(),
            helper,
            registered,
            recovery_module: self.recovery_module.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Wraps a driver that only supports local transactions.
    ///
    /// Its connections enlist as last resources.
    pub fn wrap_local(&self, driver: Arc<dyn LocalDriver>) -> Result<WrappedResource> {
        self.wrap(Arc::new(LrcoDataSource::new(driver)))
    }
}

impl fmt::Debug for XaResourceWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XaResourceWrapper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A data source registered for recovery.
pub struct WrappedResource {
    data_source: Arc<dyn XaDataSource>,
    config: ResourceConfig,
    helper: Arc<DataSourceRecoveryHelper>,
    registered: Arc<dyn XaResourceRecoveryHelper>,
    recovery_module: Arc<dyn RecoveryModule>,
    closed: AtomicBool,
}

impl WrappedResource {
    /// Returns the resource name.
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// Returns true when connections enlist as last resources.
    pub fn is_last_resource(&self) -> bool {
        self.config.is_last_resource()
    }

    /// Returns the registered recovery helper.
    pub fn recovery_helper(&self) -> &Arc<DataSourceRecoveryHelper> {
        &self.helper
    }

    /// Opens a connection and enlists it in `transaction`.
    ///
    /// Application connections use the driver's own credentials; the
    /// recovery credentials are reserved for recovery.
    pub fn connection(&self, transaction: &Arc<dyn Transaction>) -> Result<TransactionalConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(XaError::IllegalState(format!(
                "resource {} is closed",
                self.name()
            )));
        }

        TransactionalConnection::enlist(
            ResourceConnectionManager::new(self.data_source.clone(), None),
            transaction.clone(),
            self.config.name(),
            self.config.is_last_resource(),
        )
    }

    /// Deregisters the recovery helper. Calling it again has no effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.recovery_module.remove_recovery_helper(&self.registered);
        self.helper.connections().disconnect();
        tracing::info!(name = %self.name(), "resource removed from recovery");
    }
}

impl fmt::Debug for WrappedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedResource")
            .field("config", &self.config)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
