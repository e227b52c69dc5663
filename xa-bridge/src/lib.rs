//! Adapters that let resources take part in XA two-phase-commit transactions
//! run by an external coordinator.
//!
//! The crate sits between a transaction coordinator and resource drivers:
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`ResourceConnectionManager`] | Lazily opened physical connection with guaranteed cleanup |
//! | [`DataSourceRecoveryHelper`] | Hands a data source to the coordinator's recovery scans |
//! | [`LastResourceAdapter`] | Lets a local-only connection join 2PC as the last resource |
//! | [`NamedResource`], [`NamedLastResource`] | Attach a crash-stable name to a resource |
//! | [`TransactionManagerProxy`] | Names every resource enlisted through it |
//! | [`XaResourceWrapper`] | Wires a data source for transactions and recovery |
//!
//! # Wrapping a data source
//!
//! ```rust,ignore
//! use xa_bridge::{ResourceConfig, XaResourceWrapper};
//!
//! let config = ResourceConfig::builder()
//!     .name("orders")
//!     .build()?;
//! let wrapper = XaResourceWrapper::new(recovery_module, config);
//! let orders = wrapper.wrap(data_source)?;
//!
//! // Inside a transaction begun on the coordinator:
//! let connection = orders.connection(&transaction)?;
//! ```
//!
//! # Last-resource commit
//!
//! A driver without XA support is wrapped with
//! [`wrap_local`](XaResourceWrapper::wrap_local). Its adapter votes yes at
//! prepare and performs the real commit only when the coordinator commits
//! it, after every other participant prepared. The coordinator must order
//! the commit accordingly; see [`lrco`].
//!
//! An XA data source configured with `last_resource` is enlisted through a
//! [`CommitLastResource`] instead, so the coordinator commits it last too.
//!
//! # Logging
//!
//! Diagnostics are emitted through [`tracing`]; no subscriber is installed by
//! this crate.

#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod lrco;
pub mod recovery;
pub mod resource;
pub mod transaction;
mod wrapper;

#[cfg(test)]
mod mock;

pub use config::{
    ConfigError, RecoveryCredentials, ResourceConfig, ResourceConfigBuilder, ResourceSettings,
    DEFAULT_RESOURCE_NAME,
};
pub use connection::{ManagerId, ResourceConnectionManager, TransactionalConnection};
pub use lrco::{LastResourceAdapter, LastResourceBranch, LrcoConnection, LrcoDataSource};
pub use recovery::{DataSourceRecoveryHelper, NamedRecoveryHelper, RecoveryModule};
pub use resource::{
    product_identity, CommitLastResource, EnlistedResource, NamedLastResource, NamedResource,
};
pub use transaction::{
    NamingTransaction, Synchronization, Transaction, TransactionManager, TransactionManagerProxy,
    TransactionStatus,
};
pub use wrapper::{WrappedResource, XaResourceWrapper};
pub use xa_bridge_core as core;
pub use xa_bridge_core::{
    Credentials, DriverError, DriverErrorKind, LastResourceCommit, LocalConnection, LocalDriver,
    NamedXaResource, ProductIdentity, ResourceHandle, Result, XaConnection, XaDataSource, XaError,
    XaResource, XaResourceRecoveryHelper, Xid,
};
