//! Resources as the coordinator sees them.

mod commit_last;
mod named;

use std::fmt;
use std::sync::Arc;

use xa_bridge_core::{
    AsXaResource, LastResourceCommit, NamedXaResource, ProductIdentity, ResourceHandle,
    XaResource,
};

pub use commit_last::CommitLastResource;
pub use named::{NamedLastResource, NamedResource};

/// Identity of this library build, attached to every named resource.
pub fn product_identity() -> ProductIdentity {
    ProductIdentity::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// A resource ready to be enlisted, tagged with exactly the capabilities it
/// carries.
#[derive(Clone)]
pub enum EnlistedResource {
    /// A native XA resource without a name.
    Plain(Arc<dyn XaResource>),
    /// A native XA resource with a name.
    Named(Arc<NamedResource>),
    /// A commit-last resource without a name.
    LastResource(Arc<dyn LastResourceCommit>),
    /// A commit-last resource with a name.
    NamedLastResource(Arc<NamedLastResource>),
}

impl EnlistedResource {
    /// Decorates the resource with `name`, keeping its commit-last capability.
    ///
    /// Already named resources are returned unchanged.
    pub fn named(self, name: &str) -> Self {
        match self {
            Self::Plain(resource) => Self::Named(Arc::new(NamedResource::new(resource, name))),
            Self::LastResource(resource) => {
                Self::NamedLastResource(Arc::new(NamedLastResource::new(resource, name)))
            }
            named @ (Self::Named(_) | Self::NamedLastResource(_)) => named,
        }
    }

    /// Promotes a native XA resource to commit-last, keeping its name.
    ///
    /// Resources that already commit last are returned unchanged.
    pub fn commit_last(self) -> Self {
        match self {
            Self::Plain(resource) => {
                Self::LastResource(Arc::new(CommitLastResource::new(resource)))
            }
            Self::Named(resource) => {
                let promoted = Arc::new(CommitLastResource::new(resource.inner().clone()));
                Self::NamedLastResource(Arc::new(NamedLastResource::new(
                    promoted,
                    resource.name(),
                )))
            }
            last @ (Self::LastResource(_) | Self::NamedLastResource(_)) => last,
        }
    }

    /// Returns the resource the coordinator drives.
    pub fn resource(&self) -> &dyn XaResource {
        match self {
            Self::Plain(resource) => resource.as_ref(),
            Self::Named(resource) => resource.as_ref(),
            Self::LastResource(resource) => resource.as_xa_resource(),
            Self::NamedLastResource(resource) => resource.as_ref(),
        }
    }

    /// Returns the undecorated resource.
    ///
    /// Two enlistments of the same underlying resource share this object.
    pub fn undecorated(&self) -> &dyn XaResource {
        match self {
            Self::Plain(resource) => resource.as_ref(),
            Self::Named(resource) => resource.inner().as_ref(),
            Self::LastResource(resource) => resource.as_xa_resource(),
            Self::NamedLastResource(resource) => resource.inner().as_xa_resource(),
        }
    }

    /// Returns true when the coordinator must commit this resource last.
    pub fn commits_last(&self) -> bool {
        matches!(self, Self::LastResource(_) | Self::NamedLastResource(_))
    }

    /// Returns the resource name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(resource) => Some(resource.name()),
            Self::NamedLastResource(resource) => Some(resource.name()),
            Self::Plain(_) | Self::LastResource(_) => None,
        }
    }

    /// Returns the product identity of named resources.
    pub fn product(&self) -> Option<&ProductIdentity> {
        match self {
            Self::Named(resource) => Some(resource.product()),
            Self::NamedLastResource(resource) => Some(resource.product()),
            Self::Plain(_) | Self::LastResource(_) => None,
        }
    }

    /// Returns the capability name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Named(_) => "named",
            Self::LastResource(_) => "last-resource",
            Self::NamedLastResource(_) => "named-last-resource",
        }
    }
}

impl From<ResourceHandle> for EnlistedResource {
    fn from(handle: ResourceHandle) -> Self {
        match handle {
            ResourceHandle::Standard(resource) => Self::Plain(resource),
            ResourceHandle::LastResource(resource) => Self::LastResource(resource),
        }
    }
}

impl fmt::Debug for EnlistedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnlistedResource")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}
