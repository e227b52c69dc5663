//! Recovery helpers handed to the coordinator's recovery module.
//!
//! After a crash the coordinator periodically asks every registered helper
//! for resources and calls `recover` on them to find in-doubt branches. A
//! helper owns its own connection manager, independent of the connections
//! used by live transactions.

mod helper;
mod named;

use std::sync::Arc;

use xa_bridge_core::XaResourceRecoveryHelper;

pub use helper::DataSourceRecoveryHelper;
pub use named::NamedRecoveryHelper;

/// The coordinator component that polls recovery helpers.
pub trait RecoveryModule: Send + Sync {
    /// Registers a helper for subsequent recovery passes.
    fn add_recovery_helper(&self, helper: Arc<dyn XaResourceRecoveryHelper>);

    /// Removes a previously registered helper, matched by identity.
    fn remove_recovery_helper(&self, helper: &Arc<dyn XaResourceRecoveryHelper>);
}
