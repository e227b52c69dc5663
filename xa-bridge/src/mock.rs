//! In-process doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::resource::EnlistedResource;
use crate::transaction::{Synchronization, Transaction, TransactionManager, TransactionStatus};

use xa_bridge_core::xa::XA_OK;
use xa_bridge_core::{
    same_object, Credentials, DriverError, DriverErrorKind, DriverResult, LocalConnection, Result,
    ResourceHandle, XaConnection, XaDataSource, XaError, XaResource, Xid,
};

/// Shared call journal.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// XA resource that records every call and keeps prepared branches in memory.
pub struct RecordingResource {
    label: String,
    journal: Journal,
    prepared: Mutex<Vec<Xid>>,
    timeout: Mutex<Duration>,
}

impl RecordingResource {
    pub fn new(label: &str, journal: Journal) -> Self {
        Self {
            label: label.to_string(),
            journal,
            prepared: Mutex::new(Vec::new()),
            timeout: Mutex::new(Duration::from_secs(60)),
        }
    }

    pub fn with_prepared(self, xids: Vec<Xid>) -> Self {
        *self.prepared.lock().unwrap() = xids;
        self
    }

    fn record(&self, call: &str) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}.{}", self.label, call));
    }
}

impl XaResource for RecordingResource {
    fn start(&self, _xid: &Xid, _flags: i32) -> Result<()> {
        self.record("start");
        Ok(())
    }

    fn end(&self, _xid: &Xid, _flags: i32) -> Result<()> {
        self.record("end");
        Ok(())
    }

    fn prepare(&self, xid: &Xid) -> Result<i32> {
        self.record("prepare");
        self.prepared.lock().unwrap().push(xid.clone());
        Ok(XA_OK)
    }

    fn commit(&self, xid: &Xid, _one_phase: bool) -> Result<()> {
        self.record("commit");
        self.prepared.lock().unwrap().retain(|x| x != xid);
        Ok(())
    }

    fn rollback(&self, xid: &Xid) -> Result<()> {
        self.record("rollback");
        self.prepared.lock().unwrap().retain(|x| x != xid);
        Ok(())
    }

    fn forget(&self, _xid: &Xid) -> Result<()> {
        self.record("forget");
        Ok(())
    }

    fn recover(&self, _flags: i32) -> Result<Vec<Xid>> {
        self.record("recover");
        Ok(self.prepared.lock().unwrap().clone())
    }

    fn transaction_timeout(&self) -> Result<Duration> {
        self.record("transaction_timeout");
        Ok(*self.timeout.lock().unwrap())
    }

    fn set_transaction_timeout(&self, timeout: Duration) -> Result<bool> {
        self.record("set_transaction_timeout");
        *self.timeout.lock().unwrap() = timeout;
        Ok(true)
    }

    fn is_same_rm(&self, other: &dyn XaResource) -> Result<bool> {
        self.record("is_same_rm");
        Ok(same_object(self, other))
    }
}

/// Data source handing out connections to one shared [`RecordingResource`].
pub struct MockDataSource {
    pub resource: Arc<RecordingResource>,
    pub fail_connect: AtomicBool,
    pub fail_resource: AtomicBool,
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub credentials_seen: Mutex<Vec<Option<Credentials>>>,
}

impl MockDataSource {
    pub fn new(resource: RecordingResource) -> Self {
        Self {
            resource: Arc::new(resource),
            fail_connect: AtomicBool::new(false),
            fail_resource: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            credentials_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl XaDataSource for MockDataSource {
    fn connect(&self, credentials: Option<&Credentials>) -> DriverResult<Box<dyn XaConnection>> {
        self.credentials_seen
            .lock()
            .unwrap()
            .push(credentials.cloned());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DriverError::new(
                DriverErrorKind::ConnectionRefused,
                "resource is down",
            ));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            resource: self.resource.clone(),
            fail_resource: self.fail_resource.load(Ordering::SeqCst),
            closes: self.closes.clone(),
        }))
    }
}

struct MockConnection {
    resource: Arc<RecordingResource>,
    fail_resource: bool,
    closes: Arc<AtomicUsize>,
}

impl XaConnection for MockConnection {
    fn xa_resource(&self) -> DriverResult<ResourceHandle> {
        if self.fail_resource {
            return Err(DriverError::new(DriverErrorKind::Other, "no xa resource"));
        }
        Ok(ResourceHandle::Standard(self.resource.clone()))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Err(DriverError::new(DriverErrorKind::Other, "close is noisy"))
    }
}

/// Local connection with switchable failures.
pub struct MockLocalConnection {
    pub journal: Journal,
    pub auto_commit: AtomicBool,
    pub read_only: AtomicBool,
    pub closed: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_rollback: AtomicBool,
    pub fail_set_auto_commit: AtomicBool,
}

impl MockLocalConnection {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            auto_commit: AtomicBool::new(true),
            read_only: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            fail_rollback: AtomicBool::new(false),
            fail_set_auto_commit: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.journal.lock().unwrap().push(format!("local.{}", call));
    }
}

impl LocalConnection for MockLocalConnection {
    fn commit(&self) -> DriverResult<()> {
        self.record("commit");
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(DriverError::new(DriverErrorKind::ConnectionLost, "socket reset"));
        }
        Ok(())
    }

    fn rollback(&self) -> DriverResult<()> {
        self.record("rollback");
        if self.fail_rollback.load(Ordering::SeqCst) {
            return Err(DriverError::new(DriverErrorKind::Other, "rollback failed"));
        }
        Ok(())
    }

    fn set_auto_commit(&self, auto_commit: bool) -> DriverResult<()> {
        self.record(&format!("set_auto_commit({})", auto_commit));
        if self.fail_set_auto_commit.load(Ordering::SeqCst) {
            return Err(DriverError::new(DriverErrorKind::Other, "auto-commit refused"));
        }
        self.auto_commit.store(auto_commit, Ordering::SeqCst);
        Ok(())
    }

    fn auto_commit(&self) -> DriverResult<bool> {
        Ok(self.auto_commit.load(Ordering::SeqCst))
    }

    fn is_read_only(&self) -> DriverResult<bool> {
        Ok(self.read_only.load(Ordering::SeqCst))
    }

    fn is_closed(&self) -> DriverResult<bool> {
        Ok(self.closed.load(Ordering::SeqCst))
    }

    fn close(&self) -> DriverResult<()> {
        self.record("close");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Transaction that records enlistments without driving the resources.
pub struct MockTransaction {
    status: Mutex<TransactionStatus>,
    enlisted: Mutex<Vec<EnlistedResource>>,
    delisted: Mutex<Vec<(EnlistedResource, i32)>>,
    synchronizations: Mutex<Vec<Arc<dyn Synchronization>>>,
    refuse: AtomicBool,
    reject_synchronizations: AtomicBool,
}

impl MockTransaction {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(TransactionStatus::Active),
            enlisted: Mutex::new(Vec::new()),
            delisted: Mutex::new(Vec::new()),
            synchronizations: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
            reject_synchronizations: AtomicBool::new(false),
        }
    }

    pub fn refuse(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn reject_synchronizations(&self) {
        self.reject_synchronizations.store(true, Ordering::SeqCst);
    }

    pub fn synchronization_count(&self) -> usize {
        self.synchronizations.lock().unwrap().len()
    }

    pub fn enlisted(&self) -> Vec<EnlistedResource> {
        self.enlisted.lock().unwrap().clone()
    }

    pub fn delisted(&self) -> Vec<(EnlistedResource, i32)> {
        self.delisted.lock().unwrap().clone()
    }

    fn complete(&self, status: TransactionStatus) {
        *self.status.lock().unwrap() = status;
        let synchronizations = self.synchronizations.lock().unwrap().clone();
        for synchronization in synchronizations {
            synchronization.after_completion(status);
        }
    }
}

impl Transaction for MockTransaction {
    fn commit(&self) -> Result<()> {
        if *self.status.lock().unwrap() == TransactionStatus::MarkedRollback {
            self.complete(TransactionStatus::RolledBack);
            return Err(XaError::RolledBack("marked rollback-only".into()));
        }
        let synchronizations = self.synchronizations.lock().unwrap().clone();
        for synchronization in synchronizations {
            synchronization.before_completion();
        }
        self.complete(TransactionStatus::Committed);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.complete(TransactionStatus::RolledBack);
        Ok(())
    }

    fn set_rollback_only(&self) -> Result<()> {
        *self.status.lock().unwrap() = TransactionStatus::MarkedRollback;
        Ok(())
    }

    fn status(&self) -> Result<TransactionStatus> {
        Ok(*self.status.lock().unwrap())
    }

    fn enlist_resource(&self, resource: EnlistedResource) -> Result<bool> {
        if self.refuse.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.enlisted.lock().unwrap().push(resource);
        Ok(true)
    }

    fn delist_resource(&self, resource: EnlistedResource, flags: i32) -> Result<bool> {
        self.delisted.lock().unwrap().push((resource, flags));
        Ok(true)
    }

    fn register_synchronization(&self, synchronization: Arc<dyn Synchronization>) -> Result<()> {
        if self.reject_synchronizations.load(Ordering::SeqCst) {
            return Err(XaError::IllegalState("synchronizations closed".into()));
        }
        self.synchronizations.lock().unwrap().push(synchronization);
        Ok(())
    }
}

/// Single-threaded transaction manager over [`MockTransaction`]s.
pub struct MockTransactionManager {
    current: Mutex<Option<Arc<dyn Transaction>>>,
    last_begun: Mutex<Option<Arc<MockTransaction>>>,
    timeout: Mutex<Option<Duration>>,
}

impl MockTransactionManager {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            last_begun: Mutex::new(None),
            timeout: Mutex::new(None),
        }
    }

    /// Returns the most recently begun transaction.
    pub fn current_mock(&self) -> Arc<MockTransaction> {
        self.last_begun.lock().unwrap().clone().unwrap()
    }

    pub fn timeout(&self) -> Option<Duration> {
        *self.timeout.lock().unwrap()
    }

    fn take_current(&self) -> Result<Arc<dyn Transaction>> {
        self.current
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| XaError::IllegalState("no transaction".into()))
    }
}

impl TransactionManager for MockTransactionManager {
    fn begin(&self) -> Result<()> {
        let mut current = self.current.lock().unwrap();
        if current.is_some() {
            return Err(XaError::IllegalState("nested transaction".into()));
        }
        let tx = Arc::new(MockTransaction::new());
        *self.last_begun.lock().unwrap() = Some(tx.clone());
        *current = Some(tx);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.take_current()?.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.take_current()?.rollback()
    }

    fn status(&self) -> Result<TransactionStatus> {
        match self.current.lock().unwrap().as_ref() {
            Some(tx) => tx.status(),
            None => Ok(TransactionStatus::NoTransaction),
        }
    }

    fn transaction(&self) -> Result<Option<Arc<dyn Transaction>>> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn suspend(&self) -> Result<Option<Arc<dyn Transaction>>> {
        Ok(self.current.lock().unwrap().take())
    }

    fn resume(&self, transaction: Arc<dyn Transaction>) -> Result<()> {
        *self.current.lock().unwrap() = Some(transaction);
        Ok(())
    }

    fn set_rollback_only(&self) -> Result<()> {
        match self.current.lock().unwrap().as_ref() {
            Some(tx) => tx.set_rollback_only(),
            None => Err(XaError::IllegalState("no transaction".into())),
        }
    }

    fn set_transaction_timeout(&self, timeout: Duration) -> Result<()> {
        *self.timeout.lock().unwrap() = Some(timeout);
        Ok(())
    }
}

/// Asserts that `result` failed with a protocol violation.
pub fn assert_protocol<T: std::fmt::Debug>(result: Result<T>) {
    match result {
        Err(XaError::Protocol(_)) => {}
        other => panic!("expected protocol violation, got {:?}", other),
    }
}
