//! XA view of a local-only connection.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use xa_bridge_core::xa::{XA_OK, XA_TMJOIN, XA_TMNOFLAGS, XA_TMRESUME};
use xa_bridge_core::{
    same_object, DriverError, DriverErrorKind, LastResourceCommit, LocalConnection, Result,
    XaError, XaResource, Xid,
};

/// Branch state of one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LastResourceBranch {
    /// No transaction is associated with the connection.
    #[default]
    NotStarted,
    /// The connection works for this branch.
    Active(Xid),
}

impl LastResourceBranch {
    /// Returns the active xid, if any.
    pub fn xid(&self) -> Option<&Xid> {
        match self {
            Self::NotStarted => None,
            Self::Active(xid) => Some(xid),
        }
    }

    fn require(&self, xid: &Xid) -> Result<()> {
        match self {
            Self::Active(active) if active == xid => Ok(()),
            Self::Active(active) => Err(XaError::protocol(format!(
                "invalid xid: expected {}, but was {}",
                active, xid
            ))),
            Self::NotStarted => Err(XaError::protocol(format!(
                "no active branch for xid {}",
                xid
            ))),
        }
    }
}

/// Adapts a [`LocalConnection`] into a resource that commits last.
///
/// At most one branch is active per adapter. Branch transitions are
/// serialized by an internal lock, and `commit`/`rollback` clear the branch
/// whatever the physical outcome.
pub struct LastResourceAdapter {
    connection: Arc<dyn LocalConnection>,
    branch: Mutex<LastResourceBranch>,
}

impl LastResourceAdapter {
    /// Creates an adapter over `connection`.
    pub fn new(connection: Arc<dyn LocalConnection>) -> Self {
        Self {
            connection,
            branch: Mutex::new(LastResourceBranch::NotStarted),
        }
    }

    /// Returns the xid of the active branch, if any.
    pub fn active_xid(&self) -> Option<Xid> {
        self.lock().xid().cloned()
    }

    /// Returns the adapted connection.
    pub fn connection(&self) -> &Arc<dyn LocalConnection> {
        &self.connection
    }

    fn lock(&self) -> MutexGuard<'_, LastResourceBranch> {
        self.branch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn physical_commit(&self) -> Result<()> {
        let closed = self
            .connection
            .is_closed()
            .map_err(|e| XaError::fault("failed to check connection state", e))?;
        if closed {
            return Err(XaError::fault(
                "commit",
                DriverError::new(DriverErrorKind::Closed, "connection is closed"),
            ));
        }

        let read_only = self
            .connection
            .is_read_only()
            .map_err(|e| XaError::fault("failed to check read-only mode", e))?;
        if read_only {
            tracing::debug!("skipping commit of read-only connection");
            return Ok(());
        }

        self.connection
            .commit()
            .map_err(|e| XaError::fault("commit failed", e))
    }

    /// Puts the connection back into auto-commit mode and forgets the branch.
    fn finish(&self, branch: &mut LastResourceBranch) {
        if let Err(e) = self.connection.set_auto_commit(true) {
            tracing::warn!(error = %e, "failed to restore auto-commit");
        }
        if let Some(xid) = branch.xid() {
            tracing::debug!(xid = %xid, "last resource branch cleared");
        }
        *branch = LastResourceBranch::NotStarted;
    }
}

impl XaResource for LastResourceAdapter {
    fn start(&self, xid: &Xid, flags: i32) -> Result<()> {
        let mut branch = self.lock();
        match flags {
            XA_TMNOFLAGS => {
                if let Some(active) = branch.xid() {
                    return Err(XaError::protocol(format!(
                        "already enlisted in another transaction with xid {}",
                        active
                    )));
                }
                self.connection
                    .set_auto_commit(false)
                    .map_err(|e| XaError::fault("could not turn off auto-commit", e))?;
                tracing::debug!(xid = %xid, "last resource branch started");
                *branch = LastResourceBranch::Active(xid.clone());
                Ok(())
            }
            XA_TMRESUME | XA_TMJOIN => branch.require(xid),
            other => Err(XaError::protocol(format!("unknown start flag: {:#x}", other))),
        }
    }

    fn end(&self, xid: &Xid, _flags: i32) -> Result<()> {
        self.lock().require(xid)
    }

    /// Votes yes for the active branch. The vote does not look at the
    /// connection: this resource can only be committed last, once every
    /// other participant has prepared.
    fn prepare(&self, xid: &Xid) -> Result<i32> {
        self.lock().require(xid)?;
        Ok(XA_OK)
    }

    fn commit(&self, xid: &Xid, _one_phase: bool) -> Result<()> {
        let mut branch = self.lock();
        branch.require(xid)?;

        let result = self.physical_commit();
        self.finish(&mut branch);

        if let Err(e) = &result {
            tracing::error!(xid = %xid, error = %e, "last resource commit failed");
        }
        result
    }

    fn rollback(&self, xid: &Xid) -> Result<()> {
        let mut branch = self.lock();
        branch.require(xid)?;

        let result = self
            .connection
            .rollback()
            .map_err(|e| XaError::fault("rollback failed", e));
        self.finish(&mut branch);

        if let Err(e) = &result {
            tracing::error!(xid = %xid, error = %e, "last resource rollback failed");
        }
        result
    }

    fn forget(&self, xid: &Xid) -> Result<()> {
        Err(XaError::protocol(format!(
            "forget called for {} on a resource that never completes heuristically",
            xid
        )))
    }

    /// Nothing is ever left in doubt: prepare cannot fail and commit or
    /// rollback resolve synchronously.
    fn recover(&self, _flags: i32) -> Result<Vec<Xid>> {
        Ok(Vec::new())
    }

    fn transaction_timeout(&self) -> Result<Duration> {
        Err(XaError::protocol(
            "transaction timeout is not tracked by the last resource",
        ))
    }

    fn set_transaction_timeout(&self, _timeout: Duration) -> Result<bool> {
        Ok(false)
    }

    fn is_same_rm(&self, other: &dyn XaResource) -> Result<bool> {
        Ok(same_object(self, other))
    }
}

impl LastResourceCommit for LastResourceAdapter {}

impl fmt::Debug for LastResourceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LastResourceAdapter")
            .field("branch", &*self.lock())
            .finish()
    }
}
