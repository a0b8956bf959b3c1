//! Grant and revoke operations.
//!
//! Membership mutations that must hold the tree and uniqueness invariants.
//! Each operation maps to one transactional adapter call for its writes, so
//! an interrupted call leaves no partial rows behind. Callers (the engine)
//! serialize these against structural mutations.

use itertools::Itertools;
use std::collections::HashSet;

use crate::membership::MembershipStore;
use crate::prelude::*;
use crate::roles::RoleCatalog;
use crate::tree::HierarchyTree;
use liege_types::realm_adapter::RealmAdapter;

/// Grants the named role to the user at the node.
///
/// Attaches to the user's existing member there, or creates one holding
/// exactly that role. A duplicate attachment surfaces as
/// `DuplicateRoleAssignment`; callers that want idempotent grants check
/// first or treat that error as already-granted.
pub(crate) async fn grant(
	members: &MembershipStore,
	catalog: &RoleCatalog,
	user_id: UserId,
	role_name: &str,
	node_id: NodeId,
) -> LgResult<Member> {
	let role = catalog
		.find_by_name(role_name)
		.ok_or_else(|| Error::RoleNotFound(role_name.into()))?;

	match members.member_at(user_id, node_id).await? {
		Some(mut member) => {
			members.attach_role(member.member_id, role.role_id).await?;
			member.roles.push(role.role_id);
			info!("granted {} to {} at {}", role_name, user_id, node_id);
			Ok(member)
		}
		None => {
			let member = members
				.create_membership(user_id, node_id, &[role.role_id], role.role_id)
				.await?;
			info!("granted {} to {} at {} (new member)", role_name, user_id, node_id);
			Ok(member)
		}
	}
}

/// Removes the user's members at the node and at every descendant node.
/// Returns how many members were destroyed.
pub(crate) async fn revoke_access(
	adapter: &dyn RealmAdapter,
	tree: &HierarchyTree,
	user_id: UserId,
	node_id: NodeId,
) -> LgResult<u64> {
	let mut node_ids: Vec<NodeId> = tree.descendants_of(node_id)?.iter().copied().collect();
	node_ids.push(node_id);
	node_ids.sort_unstable();

	let removed = adapter.delete_user_members_at(user_id, &node_ids).await?;
	info!("revoked access for {} at {}: {} members removed", user_id, node_id, removed);
	Ok(removed)
}

/// Removes the named role from the user's member at the node.
///
/// If it was the member's only role: the forced variant falls through to a
/// full `revoke_access`, the non-forced one leaves an empty-role member in
/// place. Detaching a role the member does not hold is a no-op.
pub(crate) async fn revoke_role(
	adapter: &dyn RealmAdapter,
	members: &MembershipStore,
	catalog: &RoleCatalog,
	tree: &HierarchyTree,
	user_id: UserId,
	role_name: &str,
	node_id: NodeId,
	force: bool,
) -> LgResult<()> {
	let role = catalog
		.find_by_name(role_name)
		.ok_or_else(|| Error::RoleNotFound(role_name.into()))?;
	let member =
		members.member_at(user_id, node_id).await?.ok_or(Error::MemberNotFound)?;

	let last_role = member.roles == [role.role_id];
	if last_role && force {
		revoke_access(adapter, tree, user_id, node_id).await?;
		return Ok(());
	}
	if member.roles.contains(&role.role_id) {
		members.detach_role(member.member_id, role.role_id).await?;
		info!("revoked {} from {} at {}", role_name, user_id, node_id);
	}
	Ok(())
}

/// All roles the user holds at the node, highest privilege first.
///
/// Direct roles count in full; roles held at ancestors count when they are
/// inheriting. A user with no roles here but a membership somewhere below
/// still gets the default role back, so navigating to this node stays
/// explainable.
pub(crate) fn roles_held_at(
	catalog: &RoleCatalog,
	tree: &HierarchyTree,
	grants: &[Member],
	node_id: NodeId,
	default_role: RoleId,
) -> LgResult<Vec<Role>> {
	let ancestors: HashSet<NodeId> =
		tree.ancestors_of(node_id)?.iter().copied().collect();
	let descendants = tree.descendants_of(node_id)?;

	let mut held: Vec<RoleId> = Vec::new();
	let mut below = false;
	for member in grants {
		if member.node_id == node_id {
			held.extend(member.roles.iter().copied());
		} else if ancestors.contains(&member.node_id) {
			held.extend(
				member
					.roles
					.iter()
					.copied()
					.filter(|id| catalog.get(*id).is_some_and(|r| r.inherited)),
			);
		} else if descendants.contains(&member.node_id) {
			below = true;
		}
	}

	let mut held: Vec<RoleId> = held.into_iter().unique().collect();
	if held.is_empty() {
		if !below {
			return Ok(Vec::new());
		}
		held.push(default_role);
	}

	catalog.sort_by_privilege(&mut held);
	Ok(held.iter().filter_map(|id| catalog.get(*id).cloned()).collect())
}

// vim: ts=4
