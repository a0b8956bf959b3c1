//! Capability interfaces implemented by the user and resource stores.
//!
//! The engine never reaches into domain tables. The stores hand it these two
//! capabilities by composition at construction time; the engine calls them
//! for caller-input validation before touching anything.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

/// User store capability: answers whether an identity names a known user.
#[async_trait]
pub trait UserDirectory: Debug + Send + Sync {
	async fn is_valid_user(&self, user_id: UserId) -> LgResult<bool>;
}

/// Resource store capability: which resource types participate in the
/// hierarchy, and whether a given resource exists.
#[async_trait]
pub trait ResourceDirectory: Debug + Send + Sync {
	/// Whether resources of this type carry a hierarchy node at all
	fn is_hierarchical(&self, typ: &str) -> bool;

	/// Whether the referenced resource exists in its store
	async fn resource_exists(&self, resource: &ResourceRef) -> LgResult<bool>;
}

// vim: ts=4
