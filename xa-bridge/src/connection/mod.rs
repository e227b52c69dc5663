//! Lazy lifecycle of physical resource connections.

mod manager;
mod transactional;

pub use manager::{ManagerId, ResourceConnectionManager};
pub use transactional::TransactionalConnection;
