//! Liege is a hierarchical role-based access engine.
//!
//! Domain resources (projects, folders, documents, anything the caller
//! manages) are arranged in a tree of hierarchy nodes. Users hold roles at
//! individual nodes; inheriting roles extend down the subtree until a
//! privilege boundary, and every reachable node exposes its path back to the
//! root. The engine answers two questions:
//!
//! - which nodes can this user reach, and at which role?
//! - which members can this user see at or under a node?
//!
//! Persistence, user identity, and resource ownership stay outside: the
//! engine talks to them through the [`realm_adapter::RealmAdapter`],
//! [`directory::UserDirectory`], and [`directory::ResourceDirectory`] traits.

// Re-export shared types and adapter traits from liege-types
pub use liege_types::directory;
pub use liege_types::error;
pub use liege_types::realm_adapter;
pub use liege_types::types;

// Engine re-exports
pub use liege_core::engine;
pub use liege_core::membership;
pub use liege_core::prelude;
pub use liege_core::resolver;
pub use liege_core::roles;
pub use liege_core::settings;
pub use liege_core::tree;

pub use liege_core::engine::Engine;
pub use liege_core::resolver::{AccessOptions, AccessResolver};
pub use liege_core::settings::{EngineSettings, RoleSpec};

// vim: ts=4
