//! Coordinator-side transaction contracts and the naming proxy.
//!
//! The traits describe the subset of a transaction manager this crate talks
//! to. Implementations come from the coordinator; [`TransactionManagerProxy`]
//! decorates one so that every resource enlisted through it carries a name.

mod proxy;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use xa_bridge_core::{AsAny, Result};

use crate::resource::EnlistedResource;

pub use proxy::{NamingTransaction, TransactionManagerProxy};

/// Lifecycle state of a global transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Work is in progress.
    Active,
    /// The only possible outcome is rollback.
    MarkedRollback,
    /// Participants are being asked to vote.
    Preparing,
    /// Every participant voted yes.
    Prepared,
    /// Commit is in progress.
    Committing,
    /// The transaction committed.
    Committed,
    /// Rollback is in progress.
    RollingBack,
    /// The transaction rolled back.
    RolledBack,
    /// No transaction is associated with the caller.
    NoTransaction,
    /// The state cannot be determined.
    Unknown,
}

impl TransactionStatus {
    /// Returns true once the outcome is final.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }

    /// Returns true while new resources may still be enlisted.
    pub fn accepts_enlistment(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::MarkedRollback => "marked-rollback",
            Self::Preparing => "preparing",
            Self::Prepared => "prepared",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::RollingBack => "rolling-back",
            Self::RolledBack => "rolled-back",
            Self::NoTransaction => "no-transaction",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Callback invoked around transaction completion.
pub trait Synchronization: Send + Sync {
    /// Called before the two-phase commit starts.
    fn before_completion(&self);

    /// Called with the final status once the transaction completed.
    fn after_completion(&self, status: TransactionStatus);
}

/// A global transaction resources can be enlisted in.
pub trait Transaction: AsAny + Send + Sync {
    /// Completes the transaction with a commit.
    fn commit(&self) -> Result<()>;

    /// Completes the transaction with a rollback.
    fn rollback(&self) -> Result<()>;

    /// Marks the transaction so that it can only roll back.
    fn set_rollback_only(&self) -> Result<()>;

    /// Returns the current status.
    fn status(&self) -> Result<TransactionStatus>;

    /// Adds a participant; returns false when the coordinator refused it.
    fn enlist_resource(&self, resource: EnlistedResource) -> Result<bool>;

    /// Dissociates a participant; `flags` is `XA_TMSUCCESS`, `XA_TMFAIL` or
    /// `XA_TMSUSPEND`.
    fn delist_resource(&self, resource: EnlistedResource, flags: i32) -> Result<bool>;

    /// Registers a completion callback.
    fn register_synchronization(&self, synchronization: Arc<dyn Synchronization>) -> Result<()>;
}

/// Thread-bound transaction demarcation.
pub trait TransactionManager: Send + Sync {
    /// Starts a transaction for the calling thread.
    fn begin(&self) -> Result<()>;

    /// Commits the calling thread's transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls back the calling thread's transaction.
    fn rollback(&self) -> Result<()>;

    /// Returns the status of the calling thread's transaction.
    fn status(&self) -> Result<TransactionStatus>;

    /// Returns the calling thread's transaction, if any.
    fn transaction(&self) -> Result<Option<Arc<dyn Transaction>>>;

    /// Dissociates the calling thread from its transaction.
    fn suspend(&self) -> Result<Option<Arc<dyn Transaction>>>;

    /// Associates the calling thread with a suspended transaction.
    fn resume(&self, transaction: Arc<dyn Transaction>) -> Result<()>;

    /// Marks the calling thread's transaction rollback-only.
    fn set_rollback_only(&self) -> Result<()>;

    /// Sets the timeout applied to transactions started afterwards.
    fn set_transaction_timeout(&self, timeout: Duration) -> Result<()>;
}

/// Returns the address of a transaction, for identity comparisons.
pub(crate) fn transaction_addr(transaction: &Arc<dyn Transaction>) -> usize {
    Arc::as_ptr(transaction) as *const () as usize
}
