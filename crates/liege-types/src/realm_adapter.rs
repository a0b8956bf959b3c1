//! Adapter that durably stores hierarchy nodes, roles, and memberships.
//!
//! The engine defines *what* must be queried; a `RealmAdapter` implementation
//! decides how rows are stored. Read methods used by the access resolver are
//! bulk-shaped on purpose: one call returns everything a resolution needs, so
//! the number of adapter round-trips per operation stays constant regardless
//! of tree size. Compound writes (member + role attachments, cascading
//! deletes) must be atomic: either every row change commits or none does.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

/// A position in the resource tree. Wraps exactly one owning resource.
///
/// The parent relation forms a forest of rooted trees; the closure index over
/// it lives in the engine and is rebuilt from these rows at startup.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Node {
	pub node_id: NodeId,
	/// None for a root node
	pub parent_id: Option<NodeId>,
	pub resource: ResourceRef,
	pub created_at: Timestamp,
}

/// A named privilege level.
///
/// Higher `level` means more privileged; ties are equal privilege. `inherited`
/// controls whether holding the role at a node extends access to descendant
/// nodes. `escalates_to` links to the role this one is treated as when
/// filtering inherited access by role name.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Role {
	pub role_id: RoleId,
	pub name: Box<str>,
	pub level: i32,
	pub inherited: bool,
	pub escalates_to: Option<RoleId>,
}

/// A user's role assignment at one specific node.
///
/// Unique per (user, node). Holds the attached role ids; role attachments
/// live and die with the member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Member {
	pub member_id: MemberId,
	pub user_id: UserId,
	pub node_id: NodeId,
	pub roles: Vec<RoleId>,
	pub created_at: Timestamp,
}

/// Data needed to define a new role
#[derive(Debug)]
pub struct NewRole<'a> {
	pub name: &'a str,
	pub level: i32,
	pub inherited: bool,
	pub escalates_to: Option<RoleId>,
}

/// A liege realm adapter
///
/// Every `RealmAdapter` implementation is required to implement this trait.
/// A `RealmAdapter` is responsible for durably storing the hierarchy's nodes,
/// the role catalog, and all memberships, and for executing the bulk queries
/// the access resolver is built on.
#[async_trait]
pub trait RealmAdapter: Debug + Send + Sync {
	// Nodes
	/// Persists a new node and returns it with its assigned id
	async fn create_node(
		&self,
		parent_id: Option<NodeId>,
		resource: &ResourceRef,
	) -> LgResult<Node>;

	/// Rewrites a node's parent pointer
	async fn update_node_parent(
		&self,
		node_id: NodeId,
		parent_id: Option<NodeId>,
	) -> LgResult<()>;

	/// Deletes a node together with the members at it (one transaction).
	/// Descendant nodes are untouched; their deletion is driven by their own
	/// resources.
	async fn delete_node(&self, node_id: NodeId) -> LgResult<()>;

	/// Reads every node; used to rebuild the closure index at startup
	async fn list_nodes(&self) -> LgResult<Vec<Node>>;

	// Roles
	async fn read_role_by_name(&self, name: &str) -> LgResult<Option<Role>>;

	/// Persists a new role; fails with `DuplicateRoleName` if the name exists
	async fn create_role(&self, role: &NewRole<'_>) -> LgResult<Role>;

	async fn list_roles(&self) -> LgResult<Vec<Role>>;

	// Members
	async fn read_member(&self, user_id: UserId, node_id: NodeId) -> LgResult<Option<Member>>;

	/// Every membership the user holds anywhere in the tree, roles included.
	/// One round-trip; the resolver depends on that.
	async fn list_user_members(&self, user_id: UserId) -> LgResult<Vec<Member>>;

	/// Every membership at any of the given nodes, roles included. One
	/// round-trip regardless of how many nodes are asked for.
	async fn list_members_at(&self, node_ids: &[NodeId]) -> LgResult<Vec<Member>>;

	/// Creates a member with the given roles attached, atomically. Fails with
	/// `DuplicateMembership` if the (user, node) pair already has one.
	async fn create_member(
		&self,
		user_id: UserId,
		node_id: NodeId,
		roles: &[RoleId],
	) -> LgResult<Member>;

	/// Fails with `DuplicateRoleAssignment` if the member already holds the role
	async fn attach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()>;

	/// Removes the role from the member; the member row itself stays.
	/// Removing a role the member does not hold is a no-op.
	async fn detach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()>;

	/// Deletes every member the user holds at any of the given nodes,
	/// attachments included, in one transaction. Returns the number of
	/// members removed.
	async fn delete_user_members_at(
		&self,
		user_id: UserId,
		node_ids: &[NodeId],
	) -> LgResult<u64>;
}

// vim: ts=4
