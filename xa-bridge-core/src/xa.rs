//! XA flags, return codes and the transaction branch identifier.
//!
//! Values follow the X/Open XA specification so that they can be exchanged
//! verbatim with any coordinator.

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{Result, XaError};

// Flags passed to `start`, `end` and `recover`.

/// No flag.
pub const XA_TMNOFLAGS: i32 = 0x00000000;
/// `start`: join a branch another association already started.
pub const XA_TMJOIN: i32 = 0x00200000;
/// `start`: resume a suspended association.
pub const XA_TMRESUME: i32 = 0x08000000;
/// `end`: the work of the association succeeded.
pub const XA_TMSUCCESS: i32 = 0x04000000;
/// `end`: the work failed and the branch is rollback-only.
pub const XA_TMFAIL: i32 = 0x20000000;
/// `end`: suspend the association instead of ending it.
pub const XA_TMSUSPEND: i32 = 0x02000000;
/// `recover`: first call of a scan.
pub const XA_TMSTARTRSCAN: i32 = 0x01000000;
/// `recover`: last call of a scan.
pub const XA_TMENDRSCAN: i32 = 0x00800000;
/// `commit`: one-phase optimisation.
pub const XA_TMONEPHASE: i32 = 0x40000000;

// Return codes of `prepare` and heuristic outcomes.

/// Vote to commit.
pub const XA_OK: i32 = 0;
/// The branch did no updates and is already completed.
pub const XA_RDONLY: i32 = 3;
/// Nothing happened; the call may be repeated.
pub const XA_RETRY: i32 = 4;
/// Heuristic outcome: partly committed, partly rolled back.
pub const XA_HEURMIX: i32 = 5;
/// Heuristic outcome: rolled back.
pub const XA_HEURRB: i32 = 6;
/// Heuristic outcome: committed.
pub const XA_HEURCOM: i32 = 7;
/// Heuristic outcome: unknown.
pub const XA_HEURHAZ: i32 = 8;

/// Rolled back, no specific reason.
pub const XA_RBROLLBACK: i32 = 100;
/// Rolled back after a communication failure.
pub const XA_RBCOMMFAIL: i32 = 101;
/// Rolled back to break a deadlock.
pub const XA_RBDEADLOCK: i32 = 102;
/// Rolled back after an integrity violation.
pub const XA_RBINTEGRITY: i32 = 103;

// Error codes.

/// An asynchronous operation is outstanding.
pub const XAER_ASYNC: i32 = -2;
/// The resource manager failed inside the branch.
pub const XAER_RMERR: i32 = -3;
/// Unknown xid.
pub const XAER_NOTA: i32 = -4;
/// Invalid arguments.
pub const XAER_INVAL: i32 = -5;
/// Call made in the wrong state.
pub const XAER_PROTO: i32 = -6;
/// The resource manager cannot be reached.
pub const XAER_RMFAIL: i32 = -7;
/// The xid is already in use.
pub const XAER_DUPID: i32 = -8;
/// The resource manager is doing work outside the global transaction.
pub const XAER_OUTSIDE: i32 = -9;

/// Returns true when `flags` asks to end a recovery scan.
pub fn is_end_scan(flags: i32) -> bool {
    flags & XA_TMENDRSCAN != 0
}

/// Transaction branch identifier.
///
/// Owned by the coordinator and only consumed here. Two Xids are the same
/// branch when all three components are equal, so an Xid read back from a
/// recovery scan after a restart matches the one used before the crash.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Bytes,
    branch_qualifier: Bytes,
}

impl Xid {
    /// Longest accepted global transaction id, in bytes.
    pub const MAXGTRIDSIZE: usize = 64;
    /// Longest accepted branch qualifier, in bytes.
    pub const MAXBQUALSIZE: usize = 64;

    /// Creates a transaction branch identifier.
    ///
    /// Fails when either component exceeds 64 bytes.
    pub fn new(
        format_id: i32,
        global_transaction_id: impl Into<Bytes>,
        branch_qualifier: impl Into<Bytes>,
    ) -> Result<Self> {
        let global_transaction_id = global_transaction_id.into();
        let branch_qualifier = branch_qualifier.into();

        if global_transaction_id.len() > Self::MAXGTRIDSIZE {
            return Err(XaError::protocol(format!(
                "global transaction id exceeds {} bytes",
                Self::MAXGTRIDSIZE
            )));
        }
        if branch_qualifier.len() > Self::MAXBQUALSIZE {
            return Err(XaError::protocol(format!(
                "branch qualifier exceeds {} bytes",
                Self::MAXBQUALSIZE
            )));
        }

        Ok(Self {
            format_id,
            global_transaction_id,
            branch_qualifier,
        })
    }

    /// Generates a random Xid with format id 0 and an empty branch qualifier.
    pub fn generate() -> Self {
        Self {
            format_id: 0,
            global_transaction_id: Bytes::copy_from_slice(Uuid::new_v4().as_bytes()),
            branch_qualifier: Bytes::new(),
        }
    }

    /// Returns a sibling branch of the same global transaction.
    pub fn branch(&self, branch_qualifier: impl Into<Bytes>) -> Result<Self> {
        Self::new(
            self.format_id,
            self.global_transaction_id.clone(),
            branch_qualifier,
        )
    }

    /// Returns the format identifier.
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// Returns the global transaction identifier.
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    /// Returns the branch qualifier.
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.format_id)?;
        write_hex(f, &self.global_transaction_id)?;
        f.write_str(":")?;
        write_hex(f, &self.branch_qualifier)
    }
}

impl fmt::Debug for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Xid({})", self)
    }
}
