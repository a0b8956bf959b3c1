//! Core engine for the liege hierarchical access platform.
//!
//! The engine resolves which hierarchy nodes a user can reach and at which
//! role, from three pieces of state: the resource tree with its closure
//! index, the role catalog, and the membership rows behind the realm
//! adapter. Mutations (grants, revokes, structural changes) keep all three
//! consistent.

pub mod engine;
mod grants;
pub mod membership;
pub mod prelude;
pub mod resolver;
pub mod roles;
pub mod settings;
pub mod tree;

// vim: ts=4
