//! Convenience re-exports for engine code and its consumers.

pub use liege_types::prelude::*;
pub use liege_types::realm_adapter::{Member, NewRole, Node, Role};

pub use crate::engine::Engine;
pub use crate::resolver::AccessOptions;
pub use crate::settings::{EngineSettings, RoleSpec};

// vim: ts=4
