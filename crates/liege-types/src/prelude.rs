//! Convenience re-exports used throughout the engine and adapter crates.

pub use crate::error::{Error, LgResult};
pub use crate::types::{MemberId, NodeId, ResourceRef, RoleId, Timestamp, UserId};

pub use tracing::{debug, error, info, warn};

// vim: ts=4
