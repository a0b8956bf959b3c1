//! Engine error type.
//!
//! A single flat enum shared by the engine and all adapters. Validation
//! variants are raised before any mutation, so a failed call has no side
//! effects. Nothing here is retried internally; retry policy for the
//! underlying store is the caller's concern.

use crate::types::{NodeId, ResourceRef};

pub type LgResult<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
	// Caller-input validation
	/// No user was supplied where one is required
	NilUser,
	/// The supplied identifier is not a known user
	NotAUser,
	/// No resource was supplied where one is required
	NilResource,
	/// The supplied reference is not an access-managed resource type
	NotAResource(ResourceRef),
	/// No hierarchy position was supplied, or the resource has no node
	NilHierarchy,
	/// The supplied reference's type does not participate in the hierarchy
	NotAHierarchy(ResourceRef),

	// Structural
	/// The mutation would make a node its own ancestor
	Cycle,

	// Uniqueness
	/// A membership already exists for this (user, node) pair
	DuplicateMembership,
	/// The member already holds this role
	DuplicateRoleAssignment,
	/// A role with this name is already defined
	DuplicateRoleName(Box<str>),

	// Not found
	NodeNotFound(NodeId),
	RoleNotFound(Box<str>),
	MemberNotFound,

	// Persistence
	DbError,
	Internal(Box<str>),
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::NilUser => write!(f, "No user given"),
			Error::NotAUser => write!(f, "Not a known user"),
			Error::NilResource => write!(f, "No resource given"),
			Error::NotAResource(res) => write!(f, "Not an access-managed resource: {}", res),
			Error::NilHierarchy => write!(f, "No hierarchy node given"),
			Error::NotAHierarchy(res) => write!(f, "Not a hierarchy-bearing resource: {}", res),
			Error::Cycle => write!(f, "Operation would create a cycle in the hierarchy"),
			Error::DuplicateMembership => write!(f, "Membership already exists for this node"),
			Error::DuplicateRoleAssignment => write!(f, "Member already holds this role"),
			Error::DuplicateRoleName(name) => write!(f, "Role name already defined: {}", name),
			Error::NodeNotFound(node_id) => write!(f, "Hierarchy node not found: {}", node_id),
			Error::RoleNotFound(name) => write!(f, "Role not found: {}", name),
			Error::MemberNotFound => write!(f, "Member not found"),
			Error::DbError => write!(f, "Database error"),
			Error::Internal(msg) => write!(f, "Internal error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_carries_context() {
		let err = Error::NodeNotFound(NodeId(12));
		assert_eq!(err.to_string(), "Hierarchy node not found: n12");

		let err = Error::NotAResource(ResourceRef::new("user", 3));
		assert_eq!(err.to_string(), "Not an access-managed resource: user:3");
	}
}

// vim: ts=4
