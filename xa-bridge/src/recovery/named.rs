//! Naming decorator for any recovery helper.

use std::fmt;
use std::sync::Arc;

use xa_bridge_core::{XaResource, XaResourceRecoveryHelper};

use crate::resource::NamedResource;

/// Names the resource produced by another recovery helper.
///
/// Used for helpers that do not name their resources themselves, such as
/// those of message-queue connection factories. Only the first resource is
/// kept.
pub struct NamedRecoveryHelper {
    inner: Arc<dyn XaResourceRecoveryHelper>,
    name: String,
}

impl NamedRecoveryHelper {
    /// Decorates `inner` with `name`.
    pub fn new(inner: Arc<dyn XaResourceRecoveryHelper>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    /// Returns the attached name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl XaResourceRecoveryHelper for NamedRecoveryHelper {
    fn initialise(&self, config: &str) -> bool {
        self.inner.initialise(config)
    }

    fn xa_resources(&self) -> Vec<Arc<dyn XaResource>> {
        match self.inner.xa_resources().into_iter().next() {
            Some(first) => vec![Arc::new(NamedResource::new(first, self.name.clone()))],
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for NamedRecoveryHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedRecoveryHelper")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
