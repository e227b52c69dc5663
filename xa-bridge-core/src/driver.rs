//! Contracts consumed from resource drivers.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::DriverResult;
use crate::resource::ResourceHandle;

/// Optional user/password pair used to open recovery connections.
///
/// Absence of credentials is `Option::<Credentials>::None`; a value is only
/// [valid](Credentials::is_valid) when at least one half is present.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Credentials {
    user: Option<String>,
    password: Option<String>,
}

impl Credentials {
    /// Creates a user/password pair.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }

    /// Creates credentials from optional halves.
    pub fn from_parts(user: Option<String>, password: Option<String>) -> Self {
        Self { user, password }
    }

    /// Returns true when at least one of user or password is present.
    pub fn is_valid(&self) -> bool {
        self.user.is_some() || self.password.is_some()
    }

    /// Returns the user, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A factory of XA-capable connections (a data source or a message-queue
/// connection factory).
pub trait XaDataSource: Send + Sync {
    /// Opens a physical connection.
    ///
    /// `None` uses the driver's own default credentials.
    fn connect(&self, credentials: Option<&Credentials>) -> DriverResult<Box<dyn XaConnection>>;
}

/// One open XA-capable physical connection.
pub trait XaConnection: Send {
    /// Returns the resource that enlists this connection in transactions.
    fn xa_resource(&self) -> DriverResult<ResourceHandle>;

    /// Closes the physical connection.
    fn close(&mut self) -> DriverResult<()>;

    /// Returns the local connection behind a commit-last connection.
    fn local_connection(&self) -> Option<Arc<dyn LocalConnection>> {
        None
    }
}

/// A driver for resources that only support local transactions.
pub trait LocalDriver: Send + Sync {
    /// Opens a physical connection.
    fn connect(&self, credentials: Option<&Credentials>) -> DriverResult<Arc<dyn LocalConnection>>;
}

/// A connection with local `commit`/`rollback` and no native XA support.
///
/// Shared between the application and the transaction adapter, hence `&self`.
pub trait LocalConnection: Send + Sync {
    /// Commits the local transaction.
    fn commit(&self) -> DriverResult<()>;

    /// Rolls back the local transaction.
    fn rollback(&self) -> DriverResult<()>;

    /// Switches auto-commit mode.
    fn set_auto_commit(&self, auto_commit: bool) -> DriverResult<()>;

    /// Returns the current auto-commit mode.
    fn auto_commit(&self) -> DriverResult<bool>;

    /// Returns true when the connection only reads.
    fn is_read_only(&self) -> DriverResult<bool>;

    /// Returns true when the connection has been closed.
    fn is_closed(&self) -> DriverResult<bool>;

    /// Closes the connection.
    fn close(&self) -> DriverResult<()>;
}
