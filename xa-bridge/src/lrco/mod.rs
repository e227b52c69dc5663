//! Last-resource commit optimisation.
//!
//! Lets a connection that only knows local `commit`/`rollback` take part in a
//! two-phase-commit transaction as its final participant. The adapter always
//! votes yes, so the coordinator must prepare every true XA participant
//! before committing it; if its commit then fails, the prepared participants
//! are rolled back. A failure between the adapter's commit and the other
//! participants' commit is the accepted risk of the optimisation.

mod adapter;
mod data_source;

pub use adapter::{LastResourceAdapter, LastResourceBranch};
pub use data_source::{LrcoConnection, LrcoDataSource};
