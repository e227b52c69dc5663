//! Commit-last view of a native XA resource.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use xa_bridge_core::{LastResourceCommit, Result, XaResource, Xid};

/// A native XA resource the coordinator must commit after every other
/// participant has prepared.
///
/// Every call is forwarded unchanged; only the commit-last capability is
/// added.
pub struct CommitLastResource {
    inner: Arc<dyn XaResource>,
}

impl CommitLastResource {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn XaResource>) -> Self {
        Self { inner }
    }

    /// Returns the wrapped resource.
    pub fn inner(&self) -> &Arc<dyn XaResource> {
        &self.inner
    }
}

impl XaResource for CommitLastResource {
    fn start(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.inner.start(xid, flags)
    }

    fn end(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.inner.end(xid, flags)
    }

    fn prepare(&self, xid: &Xid) -> Result<i32> {
        self.inner.prepare(xid)
    }

    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<()> {
        self.inner.commit(xid, one_phase)
    }

    fn rollback(&self, xid: &Xid) -> Result<()> {
        self.inner.rollback(xid)
    }

    fn forget(&self, xid: &Xid) -> Result<()> {
        self.inner.forget(xid)
    }

    fn recover(&self, flags: i32) -> Result<Vec<Xid>> {
        self.inner.recover(flags)
    }

    fn transaction_timeout(&self) -> Result<Duration> {
        self.inner.transaction_timeout()
    }

    fn set_transaction_timeout(&self, timeout: Duration) -> Result<bool> {
        self.inner.set_transaction_timeout(timeout)
    }

    fn is_same_rm(&self, other: &dyn XaResource) -> Result<bool> {
        self.inner.is_same_rm(other)
    }
}

impl LastResourceCommit for CommitLastResource {}

impl fmt::Debug for CommitLastResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitLastResource").finish_non_exhaustive()
    }
}
