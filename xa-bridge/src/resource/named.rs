//! Decorators that give a resource a stable name.
//!
//! Object identity does not survive a crash, so a coordinator that finds an
//! in-doubt Xid during recovery matches it to a configured resource by name.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use xa_bridge_core::{
    AsAny, AsXaResource, LastResourceCommit, NamedXaResource, ProductIdentity, Result,
    XaResource, Xid,
};

use super::product_identity;

/// A standard XA resource with a name attached.
pub struct NamedResource {
    inner: Arc<dyn XaResource>,
    name: String,
    product: ProductIdentity,
}

impl NamedResource {
    /// Wraps `inner` under `name`.
    pub fn new(inner: Arc<dyn XaResource>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            product: product_identity(),
        }
    }

    /// Returns the wrapped resource.
    pub fn inner(&self) -> &Arc<dyn XaResource> {
        &self.inner
    }
}

impl XaResource for NamedResource {
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

    /// Only another `NamedResource` over the same resource manager matches;
    /// a named and an unnamed view are never merged.
    fn is_same_rm(&self, other: &dyn XaResource) -> Result<bool> {
        match other.as_any().downcast_ref::<NamedResource>() {
            Some(named) => self.inner.is_same_rm(named.inner.as_ref()),
            None => Ok(false),
        }
    }
}

impl NamedXaResource for NamedResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn product(&self) -> &ProductIdentity {
        &self.product
    }
}

impl fmt::Debug for NamedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedResource")
            .field("name", &self.name)
            .field("product", &self.product)
            .finish()
    }
}

/// A last-resource adapter with a name attached.
///
/// Keeps the commit-last capability of the wrapped resource.
pub struct NamedLastResource {
    inner: Arc<dyn LastResourceCommit>,
    name: String,
    product: ProductIdentity,
}

impl NamedLastResource {
    /// Wraps `inner` under `name`.
    pub fn new(inner: Arc<dyn LastResourceCommit>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            product: product_identity(),
        }
    }

    /// Returns the wrapped resource.
    pub fn inner(&self) -> &Arc<dyn LastResourceCommit> {
        &self.inner
    }

    fn delegate(&self) -> &dyn XaResource {
        self.inner.as_xa_resource()
    }
}

impl XaResource for NamedLastResource {
    fn start(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.delegate().start(xid, flags)
    }

    fn end(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.delegate().end(xid, flags)
    }

    fn prepare(&self, xid: &Xid) -> Result<i32> {
        self.delegate().prepare(xid)
    }

    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<()> {
        self.delegate().commit(xid, one_phase)
    }

    fn rollback(&self, xid: &Xid) -> Result<()> {
        self.delegate().rollback(xid)
    }

    fn forget(&self, xid: &Xid) -> Result<()> {
        self.delegate().forget(xid)
    }

    fn recover(&self, flags: i32) -> Result<Vec<Xid>> {
        self.delegate().recover(flags)
    }

    fn transaction_timeout(&self) -> Result<Duration> {
        self.delegate().transaction_timeout()
    }

    fn set_transaction_timeout(&self, timeout: Duration) -> Result<bool> {
        self.delegate().set_transaction_timeout(timeout)
    }

    fn is_same_rm(&self, other: &dyn XaResource) -> Result<bool> {
        match other.as_any().downcast_ref::<NamedLastResource>() {
            Some(named) => self.delegate().is_same_rm(named.delegate()),
            None => Ok(false),
        }
    }
}

impl LastResourceCommit for NamedLastResource {}

impl NamedXaResource for NamedLastResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn product(&self) -> &ProductIdentity {
        &self.product
    }
}

impl fmt::Debug for NamedLastResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedLastResource")
            .field("name", &self.name)
            .field("product", &self.product)
            .finish()
    }
}
