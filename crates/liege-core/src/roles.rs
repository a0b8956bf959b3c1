//! Role catalog.
//!
//! Roles are process-wide configuration: a handful of rows created up front
//! or on first definition, then read on every resolution. The catalog keeps
//! them in memory; creation writes through the realm adapter first.

use std::collections::HashMap;

use crate::prelude::*;

/// In-memory view of the role table.
#[derive(Debug, Default)]
pub struct RoleCatalog {
	by_id: HashMap<RoleId, Role>,
	by_name: HashMap<Box<str>, RoleId>,
}

impl RoleCatalog {
	pub fn from_roles(roles: Vec<Role>) -> Self {
		let mut catalog = Self::default();
		for role in roles {
			catalog.insert(role);
		}
		catalog
	}

	/// Registers a role loaded or freshly persisted by the adapter
	pub fn insert(&mut self, role: Role) {
		self.by_name.insert(role.name.clone(), role.role_id);
		self.by_id.insert(role.role_id, role);
	}

	pub fn get(&self, role_id: RoleId) -> Option<&Role> {
		self.by_id.get(&role_id)
	}

	pub fn find_by_name(&self, name: &str) -> Option<&Role> {
		self.by_name.get(name).and_then(|id| self.by_id.get(id))
	}

	/// The escalation chain starting at the role itself, following
	/// `escalates_to` links until none remains. A link that leads back into
	/// the chain is rejected; roles are rarely mutated after creation, but a
	/// bad link must not hang a resolution.
	pub fn escalation_chain(&self, role_id: RoleId) -> LgResult<Vec<RoleId>> {
		let mut chain = Vec::new();
		let mut current = Some(role_id);
		while let Some(id) = current {
			if chain.contains(&id) {
				warn!("role escalation cycle at {}", id);
				return Err(Error::Cycle);
			}
			chain.push(id);
			current = self.by_id.get(&id).and_then(|r| r.escalates_to);
		}
		Ok(chain)
	}

	/// Highest privilege level among the given roles
	pub fn highest_level(&self, roles: &[RoleId]) -> Option<i32> {
		roles.iter().filter_map(|id| self.by_id.get(id)).map(|r| r.level).max()
	}

	/// Sorts roles by privilege, highest first; ties break on ascending role
	/// id so results are reproducible.
	pub fn sort_by_privilege(&self, roles: &mut [RoleId]) {
		roles.sort_by_key(|id| {
			let level = self.by_id.get(id).map_or(i32::MIN, |r| r.level);
			(std::cmp::Reverse(level), id.0)
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn role(id: i64, name: &str, level: i32, escalates_to: Option<i64>) -> Role {
		Role {
			role_id: RoleId(id),
			name: name.into(),
			level,
			inherited: true,
			escalates_to: escalates_to.map(RoleId),
		}
	}

	#[test]
	fn test_escalation_chain_includes_self() {
		let catalog = RoleCatalog::from_roles(vec![
			role(1, "manager", 2, Some(2)),
			role(2, "owner", 3, None),
		]);
		assert_eq!(catalog.escalation_chain(RoleId(1)).expect("chain"), vec![
			RoleId(1),
			RoleId(2)
		]);
		assert_eq!(catalog.escalation_chain(RoleId(2)).expect("chain"), vec![RoleId(2)]);
	}

	#[test]
	fn test_escalation_cycle_detected() {
		let catalog = RoleCatalog::from_roles(vec![
			role(1, "a", 1, Some(2)),
			role(2, "b", 2, Some(1)),
		]);
		assert_eq!(catalog.escalation_chain(RoleId(1)), Err(Error::Cycle));
	}

	#[test]
	fn test_privilege_ordering_deterministic() {
		let catalog = RoleCatalog::from_roles(vec![
			role(3, "guest", 0, None),
			role(1, "admin", 2, None),
			role(2, "editor", 2, None),
		]);
		let mut roles = vec![RoleId(3), RoleId(2), RoleId(1)];
		catalog.sort_by_privilege(&mut roles);
		// equal levels fall back to ascending role id
		assert_eq!(roles, vec![RoleId(1), RoleId(2), RoleId(3)]);
	}

	#[test]
	fn test_highest_level() {
		let catalog = RoleCatalog::from_roles(vec![role(1, "a", 1, None), role(2, "b", 3, None)]);
		assert_eq!(catalog.highest_level(&[RoleId(1), RoleId(2)]), Some(3));
		assert_eq!(catalog.highest_level(&[]), None);
	}
}

// vim: ts=4
