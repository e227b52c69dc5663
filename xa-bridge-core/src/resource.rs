//! Coordinator-facing resource contracts.
//!
//! A coordinator drives every branch through [`XaResource`]. The optional
//! capabilities it looks for are expressed as separate traits
//! ([`LastResourceCommit`], [`NamedXaResource`]) implemented by concrete
//! types, never synthesized at runtime.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::xa::Xid;

/// Upcast to [`Any`] so wrappers can recognise their own kind.
pub trait AsAny {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Upcast from a capability trait object to the plain resource contract.
pub trait AsXaResource {
    /// Returns `self` as `&dyn XaResource`.
    fn as_xa_resource(&self) -> &dyn XaResource;
}

impl<T: XaResource> AsXaResource for T {
    fn as_xa_resource(&self) -> &dyn XaResource {
        self
    }
}

/// XA Resource interface following the X/Open XA specification.
///
/// All methods take `&self`: a resource is shared between the coordinator,
/// the application and the recovery module, so implementations serialize
/// their own state.
pub trait XaResource: AsAny + Send + Sync {
    /// Starts work on behalf of a transaction branch.
    ///
    /// `flags` is one of `XA_TMNOFLAGS`, `XA_TMJOIN` or `XA_TMRESUME`.
    fn start(&self, xid: &Xid, flags: i32) -> Result<()>;

    /// Ends work on behalf of a transaction branch.
    fn end(&self, xid: &Xid, flags: i32) -> Result<()>;

    /// Asks the resource to vote; returns `XA_OK` or `XA_RDONLY`.
    fn prepare(&self, xid: &Xid) -> Result<i32>;

    /// Commits the transaction branch.
    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<()>;

    /// Rolls back the transaction branch.
    fn rollback(&self, xid: &Xid) -> Result<()>;

    /// Forgets about a heuristically completed transaction branch.
    fn forget(&self, xid: &Xid) -> Result<()>;

    /// Lists prepared or heuristically completed branches.
    fn recover(&self, flags: i32) -> Result<Vec<Xid>>;

    /// Returns the transaction timeout.
    fn transaction_timeout(&self) -> Result<Duration>;

    /// Sets the transaction timeout; returns false when unsupported.
    fn set_transaction_timeout(&self, timeout: Duration) -> Result<bool>;

    /// Determines if `other` is served by the same resource manager.
    fn is_same_rm(&self, other: &dyn XaResource) -> Result<bool>;
}

/// Marker for resources that must be committed after every other participant
/// has prepared.
///
/// The coordinator does not prepare such a resource; its commit decides the
/// transaction. A local-only adapter also never reports in-doubt branches
/// from `recover`, while a native XA resource promoted to commit last keeps
/// its own recovery.
pub trait LastResourceCommit: XaResource + AsXaResource {}

/// Build identity attached to named resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductIdentity {
    name: String,
    version: String,
}

impl ProductIdentity {
    /// Creates a product identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Returns the product name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the product version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for ProductIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// A resource carrying a name that survives process restarts.
///
/// Orphan filters use the name to match a recovered Xid with a configured
/// resource.
pub trait NamedXaResource: XaResource {
    /// Returns the configured resource name.
    fn name(&self) -> &str;

    /// Returns the identity of the product that wrapped the resource.
    fn product(&self) -> &ProductIdentity;
}

/// The capability set a driver connection exposes.
#[derive(Clone)]
pub enum ResourceHandle {
    /// A native XA resource.
    Standard(Arc<dyn XaResource>),
    /// A resource that commits last.
    LastResource(Arc<dyn LastResourceCommit>),
}

impl ResourceHandle {
    /// Returns the resource as a plain XA resource.
    pub fn resource(&self) -> &dyn XaResource {
        match self {
            Self::Standard(resource) => resource.as_ref(),
            Self::LastResource(resource) => resource.as_xa_resource(),
        }
    }

    /// Returns true when the resource must commit last.
    pub fn commits_last(&self) -> bool {
        matches!(self, Self::LastResource(_))
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(_) => f.write_str("ResourceHandle::Standard"),
            Self::LastResource(_) => f.write_str("ResourceHandle::LastResource"),
        }
    }
}

/// Recovery contract consumed by the coordinator's recovery module.
pub trait XaResourceRecoveryHelper: Send + Sync {
    /// Accepts the recovery module's startup handshake.
    fn initialise(&self, config: &str) -> bool;

    /// Returns the resources to scan for in-doubt branches.
    ///
    /// An empty list means "nothing to scan right now"; the recovery module
    /// asks again on its next pass.
    fn xa_resources(&self) -> Vec<Arc<dyn XaResource>>;
}

/// Returns true when both references point at the same object.
pub fn same_object(a: &dyn XaResource, b: &dyn XaResource) -> bool {
    std::ptr::eq(
        a as *const _ as *const (),
        b as *const _ as *const (),
    )
}
