//! Core types and contracts for bridging resources into XA transactions.

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod resource;
pub mod xa;

pub use driver::{Credentials, LocalConnection, LocalDriver, XaConnection, XaDataSource};
pub use error::{DriverError, DriverErrorKind, DriverResult, Result, XaError};
pub use resource::{
    same_object, AsAny, AsXaResource, LastResourceCommit, NamedXaResource, ProductIdentity,
    ResourceHandle, XaResource, XaResourceRecoveryHelper,
};
pub use xa::Xid;
