//! Membership store.
//!
//! One member per (user, node); a member exists only to scope role-holding to
//! a single node. Uniqueness and attachment cascades are enforced by the
//! realm adapter; this layer adds default-role handling and role lookups.

use std::sync::Arc;

use crate::prelude::*;
use crate::roles::RoleCatalog;
use liege_types::realm_adapter::RealmAdapter;

#[derive(Debug, Clone)]
pub struct MembershipStore {
	adapter: Arc<dyn RealmAdapter>,
}

impl MembershipStore {
	pub fn new(adapter: Arc<dyn RealmAdapter>) -> Self {
		Self { adapter }
	}

	/// The one membership for the (user, node) pair, or none
	pub async fn member_at(&self, user_id: UserId, node_id: NodeId) -> LgResult<Option<Member>> {
		self.adapter.read_member(user_id, node_id).await
	}

	/// Creates a membership; an empty role slice attaches the default role.
	/// The member and its role attachments persist atomically, and the call
	/// fails with `DuplicateMembership` if the pair already has one.
	pub async fn create_membership(
		&self,
		user_id: UserId,
		node_id: NodeId,
		roles: &[RoleId],
		default_role: RoleId,
	) -> LgResult<Member> {
		let fallback = [default_role];
		let roles = if roles.is_empty() { &fallback[..] } else { roles };
		let member = self.adapter.create_member(user_id, node_id, roles).await?;
		debug!("created member {} for {} at {}", member.member_id, user_id, node_id);
		Ok(member)
	}

	/// Fails with `DuplicateRoleAssignment` if the member already holds it
	pub async fn attach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()> {
		self.adapter.attach_role(member_id, role_id).await
	}

	/// Removes the role; the member stays even if its role set becomes empty.
	/// Cascading removal of an emptied member is the grant service's call.
	pub async fn detach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()> {
		self.adapter.detach_role(member_id, role_id).await
	}

	/// The member's roles resolved against the catalog
	pub fn roles_of(&self, member: &Member, catalog: &RoleCatalog) -> Vec<Role> {
		member.roles.iter().filter_map(|id| catalog.get(*id).cloned()).collect()
	}
}

// vim: ts=4
