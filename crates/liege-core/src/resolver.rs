//! Access resolution.
//!
//! Computes which nodes a user can reach and which members a user may see,
//! from a single bulk fetch of the user's memberships plus the in-memory
//! closure index. No per-node round-trips: the store is asked once, the rest
//! is a walk.
//!
//! Resolution rules:
//! - A membership makes its node reachable, along with the full path back to
//!   the root.
//! - An inheriting role extends reach to the subtree below the node, stopping
//!   under privilege boundaries (see `walk_inherited`).
//! - A non-inheriting role reaches only its own node.
//! - A weaker explicit grant at a descendant never revokes inherited access
//!   arriving from above it.

use std::collections::{HashMap, HashSet};

use crate::prelude::*;
use crate::roles::RoleCatalog;
use crate::tree::HierarchyTree;

/// Options controlling accessible-node resolution.
#[derive(Debug, Default, Clone)]
pub struct AccessOptions {
	/// When set, only inheriting roles whose name (or a name reached on
	/// their escalation chain) appears here propagate to descendants.
	pub inherited_roles: Option<HashSet<Box<str>>>,
	/// Expose the navigational path back to root: every direct child of
	/// every ancestor of a node where the user holds a membership.
	pub parent_access: bool,
}

/// Resolves node and member visibility for one user against a consistent
/// snapshot of the tree and the role catalog.
#[derive(Debug, Clone, Copy)]
pub struct AccessResolver<'a> {
	tree: &'a HierarchyTree,
	catalog: &'a RoleCatalog,
}

impl<'a> AccessResolver<'a> {
	pub fn new(tree: &'a HierarchyTree, catalog: &'a RoleCatalog) -> Self {
		Self { tree, catalog }
	}

	/// The set of nodes reachable through the given memberships.
	pub fn accessible_nodes(
		&self,
		grants: &[Member],
		opts: &AccessOptions,
	) -> LgResult<HashSet<NodeId>> {
		let by_node: HashMap<NodeId, &Member> =
			grants.iter().map(|m| (m.node_id, m)).collect();
		let mut acc = HashSet::new();

		for member in grants {
			if !self.tree.contains(member.node_id) {
				warn!("member {} points at a node missing from the tree", member.member_id);
				continue;
			}
			// the node itself and its full path to the root
			acc.insert(member.node_id);
			acc.extend(self.tree.ancestors_of(member.node_id)?.iter().copied());

			for role_id in &member.roles {
				let Some(role) = self.catalog.get(*role_id) else { continue };
				if !self.propagates(role, opts.inherited_roles.as_ref())? {
					continue;
				}
				self.walk_inherited(member.node_id, role.level, &by_node, &mut acc)?;
			}

			if opts.parent_access {
				for ancestor in self.tree.ancestors_of(member.node_id)? {
					acc.extend(self.tree.children_of(*ancestor)?.iter().copied());
				}
			}
		}
		Ok(acc)
	}

	/// Nodes whose members the given memberships expose: each membership
	/// node itself, plus (for inheriting roles) the subtree below it,
	/// bounded the same way as accessible-node resolution. No ancestor
	/// exposure: holding a role below somebody does not reveal them.
	pub fn manageable_nodes(&self, grants: &[Member]) -> LgResult<HashSet<NodeId>> {
		let by_node: HashMap<NodeId, &Member> =
			grants.iter().map(|m| (m.node_id, m)).collect();
		let mut managed = HashSet::new();

		for member in grants {
			if !self.tree.contains(member.node_id) {
				continue;
			}
			managed.insert(member.node_id);
			for role_id in &member.roles {
				let Some(role) = self.catalog.get(*role_id) else { continue };
				if !role.inherited {
					continue;
				}
				self.walk_inherited(member.node_id, role.level, &by_node, &mut managed)?;
			}
		}
		Ok(managed)
	}

	/// Whether the role extends access below its node, honoring the optional
	/// role-name filter. The filter matches the role's own name or any name
	/// on its escalation chain: a role escalating to an allowed one counts.
	fn propagates(&self, role: &Role, filter: Option<&HashSet<Box<str>>>) -> LgResult<bool> {
		if !role.inherited {
			return Ok(false);
		}
		let Some(allowed) = filter else { return Ok(true) };
		for id in self.catalog.escalation_chain(role.role_id)? {
			if let Some(r) = self.catalog.get(id) {
				if allowed.contains(&r.name) {
					return Ok(true);
				}
			}
		}
		Ok(false)
	}

	/// Depth-first walk below `from`, adding every node reached.
	///
	/// The walk stops under a privilege boundary: a descendant where the
	/// user's own membership holds a non-inheriting role, no inheriting one,
	/// and privilege at or above the walking level. An explicit node-scoped
	/// grant of equal or greater privilege fences its subtree; the boundary
	/// node itself stays reachable, and anything below it must be reached
	/// via another branch or its own grant.
	fn walk_inherited(
		&self,
		from: NodeId,
		walk_level: i32,
		by_node: &HashMap<NodeId, &Member>,
		acc: &mut HashSet<NodeId>,
	) -> LgResult<()> {
		let mut stack: Vec<NodeId> = self.tree.children_of(from)?.to_vec();
		while let Some(node) = stack.pop() {
			acc.insert(node);
			if let Some(member) = by_node.get(&node) {
				if self.is_boundary(member, walk_level) {
					continue;
				}
			}
			stack.extend(self.tree.children_of(node)?.iter().copied());
		}
		Ok(())
	}

	fn is_boundary(&self, member: &Member, walk_level: i32) -> bool {
		let mut has_scoped = false;
		let mut has_inheriting = false;
		for role in member.roles.iter().filter_map(|id| self.catalog.get(*id)) {
			has_scoped |= !role.inherited;
			has_inheriting |= role.inherited;
		}
		has_scoped
			&& !has_inheriting
			&& self.catalog.highest_level(&member.roles).is_some_and(|l| l >= walk_level)
	}
}


// vim: ts=4
