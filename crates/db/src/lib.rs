//! Logical database roles for Annexx.
//!
//! Application data, cache entries, background jobs, and cable messages each
//! live in their own database. [`DatabaseRouter`] binds the role an operation
//! runs against and reports per-role health.

pub mod error;
pub mod role;
pub mod router;
pub mod target;

pub use error::{ConnectionFailure, DbError};
pub use role::{Component, DatabaseRole};
pub use router::{current_role, DatabaseRouter, DatabaseStatus, RoleStatus};
pub use target::{DatabaseTarget, SqlTarget};
