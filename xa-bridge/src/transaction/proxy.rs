//! Transaction manager decorator that names enlisted resources.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use xa_bridge_core::{AsAny, Result};

use super::{transaction_addr, Synchronization, Transaction, TransactionManager, TransactionStatus};
use crate::resource::EnlistedResource;

/// Decorations handed to the coordinator, per transaction and per
/// undecorated resource.
///
/// Delisting must present the coordinator with the very object it saw at
/// enlistment, so the first decoration of a resource is reused until the
/// transaction completes. Entries hold the transaction weakly; entries of
/// transactions that were dropped without completing are pruned on the next
/// enlistment.
#[derive(Default)]
struct DecorationRegistry {
    entries: Mutex<HashMap<usize, Decorations>>,
}

struct Decorations {
    // Also pins the transaction's address while the entry exists.
    transaction: Weak<dyn Transaction>,
    resources: HashMap<usize, EnlistedResource>,
}

impl Decorations {
    fn is_live(&self) -> bool {
        self.transaction.strong_count() > 0
    }
}

impl DecorationRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<usize, Decorations>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the decoration of `resource`, creating it on first use. The
    /// flag is true when this is the first decoration within `transaction`.
    fn decorate(
        &self,
        transaction: &Arc<dyn Transaction>,
        resource: EnlistedResource,
        name: &str,
    ) -> (EnlistedResource, bool) {
        let key = resource_addr(&resource);
        let mut entries = self.lock();

        let before = entries.len();
        entries.retain(|_, decorations| decorations.is_live());
        if entries.len() < before {
            tracing::debug!(
                count = before - entries.len(),
                "pruned decorations of abandoned transactions"
            );
        }

        let addr = transaction_addr(transaction);
        let first_for_transaction = !entries.contains_key(&addr);
        let decorations = entries.entry(addr).or_insert_with(|| Decorations {
            transaction: Arc::downgrade(transaction),
            resources: HashMap::new(),
        });
        let decorated = decorations
            .resources
            .entry(key)
            .or_insert_with(|| resource.named(name))
            .clone();
        (decorated, first_for_transaction)
    }

    fn lookup(
        &self,
        transaction: &Arc<dyn Transaction>,
        resource: &EnlistedResource,
    ) -> Option<EnlistedResource> {
        self.lock()
            .get(&transaction_addr(transaction))
            .filter(|decorations| decorations.is_live())
            .and_then(|decorations| decorations.resources.get(&resource_addr(resource)))
            .cloned()
    }

    fn purge(&self, transaction: usize) {
        if let Some(decorations) = self.lock().remove(&transaction) {
            tracing::debug!(
                count = decorations.resources.len(),
                "released resource decorations"
            );
        }
    }

    fn len(&self) -> usize {
        self.lock()
            .values()
            .map(|decorations| decorations.resources.len())
            .sum()
    }
}

fn resource_addr(resource: &EnlistedResource) -> usize {
    resource.undecorated() as *const _ as *const () as usize
}

/// Drops a transaction's decorations once the coordinator completes it.
struct PurgeOnCompletion {
    registry: Weak<DecorationRegistry>,
    transaction: usize,
}

impl Synchronization for PurgeOnCompletion {
    fn before_completion(&self) {}

    fn after_completion(&self, _status: TransactionStatus) {
        if let Some(registry) = self.registry.upgrade() {
            registry.purge(self.transaction);
        }
    }
}

/// A transaction manager whose transactions name every resource enlisted in
/// them.
pub struct TransactionManagerProxy {
    delegate: Arc<dyn TransactionManager>,
    name: String,
    registry: Arc<DecorationRegistry>,
}

impl TransactionManagerProxy {
    /// Wraps `delegate`; resources are named `name`.
    pub fn new(delegate: Arc<dyn TransactionManager>, name: impl Into<String>) -> Self {
        Self {
            delegate,
            name: name.into(),
            registry: Arc::default(),
        }
    }

    /// Returns the wrapped transaction manager.
    pub fn delegate(&self) -> &Arc<dyn TransactionManager> {
        &self.delegate
    }

    /// Returns the name given to enlisted resources.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn wrap(&self, transaction: Arc<dyn Transaction>) -> Arc<dyn Transaction> {
        Arc::new(NamingTransaction {
            inner: transaction,
            name: self.name.clone(),
            registry: self.registry.clone(),
        })
    }
}

impl TransactionManager for TransactionManagerProxy {
    fn begin(&self) -> Result<()> {
        self.delegate.begin()
    }

    fn commit(&self) -> Result<()> {
        self.delegate.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.delegate.rollback()
    }

    fn status(&self) -> Result<TransactionStatus> {
        self.delegate.status()
    }

    fn transaction(&self) -> Result<Option<Arc<dyn Transaction>>> {
        Ok(self.delegate.transaction()?.map(|tx| self.wrap(tx)))
    }

    fn suspend(&self) -> Result<Option<Arc<dyn Transaction>>> {
        Ok(self.delegate.suspend()?.map(|tx| self.wrap(tx)))
    }

    /// Accepts transactions returned by this proxy as well as undecorated
    /// ones.
    fn resume(&self, transaction: Arc<dyn Transaction>) -> Result<()> {
        let inner = (*transaction)
            .as_any()
            .downcast_ref::<NamingTransaction>()
            .map(|naming| naming.inner.clone());
        self.delegate.resume(inner.unwrap_or(transaction))
    }

    fn set_rollback_only(&self) -> Result<()> {
        self.delegate.set_rollback_only()
    }

    fn set_transaction_timeout(&self, timeout: Duration) -> Result<()> {
        self.delegate.set_transaction_timeout(timeout)
    }
}

impl fmt::Debug for TransactionManagerProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManagerProxy")
            .field("name", &self.name)
            .field("decorations", &self.registry.len())
            .finish()
    }
}

/// A transaction that names resources before the coordinator sees them.
///
/// A plain resource becomes a named one; a commit-last resource becomes a
/// named commit-last resource. Resources that already carry a name are
/// passed through.
pub struct NamingTransaction {
    inner: Arc<dyn Transaction>,
    name: String,
    registry: Arc<DecorationRegistry>,
}

impl NamingTransaction {
    /// Wraps `inner` with a private decoration registry.
    pub fn new(inner: Arc<dyn Transaction>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            registry: Arc::default(),
        }
    }

    /// Returns the wrapped transaction.
    pub fn inner(&self) -> &Arc<dyn Transaction> {
        &self.inner
    }

    /// Returns the name given to enlisted resources.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn addr(&self) -> usize {
        transaction_addr(&self.inner)
    }
}

impl Transaction for NamingTransaction {
    fn commit(&self) -> Result<()> {
        self.inner.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.inner.rollback()
    }

    fn set_rollback_only(&self) -> Result<()> {
        self.inner.set_rollback_only()
    }

    fn status(&self) -> Result<TransactionStatus> {
        self.inner.status()
    }

    fn enlist_resource(&self, resource: EnlistedResource) -> Result<bool> {
        let (decorated, first) = self.registry.decorate(&self.inner, resource, &self.name);
        if first {
            let purge = Arc::new(PurgeOnCompletion {
                registry: Arc::downgrade(&self.registry),
                transaction: self.addr(),
            });
            if let Err(e) = self.inner.register_synchronization(purge) {
                // Only transactions that purge on completion keep entries.
                self.registry.purge(self.addr());
                tracing::warn!(
                    error = %e,
                    "could not track transaction completion, decoration not cached"
                );
            }
        }

        tracing::debug!(
            name = %self.name,
            kind = decorated.kind(),
            "enlisting named resource"
        );
        self.inner.enlist_resource(decorated)
    }

    fn delist_resource(&self, resource: EnlistedResource, flags: i32) -> Result<bool> {
        let decorated = match self.registry.lookup(&self.inner, &resource) {
            Some(decorated) => decorated,
            None => resource.named(&self.name),
        };
        self.inner.delist_resource(decorated, flags)
    }

    fn register_synchronization(&self, synchronization: Arc<dyn Synchronization>) -> Result<()> {
        self.inner.register_synchronization(synchronization)
    }
}

impl PartialEq for NamingTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for NamingTransaction {}

impl fmt::Debug for NamingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamingTransaction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
