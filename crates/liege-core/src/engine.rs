//! Engine composition root.
//!
//! Owns the in-memory tree and role catalog, the realm adapter, and the
//! user/resource store capabilities. Every public operation takes the state
//! lock for its full duration: queries share a read guard, mutations hold
//! the write guard, so one resolution always sees one consistent snapshot
//! and structural writers to the tree are serialized against each other.
//!
//! All caller-input validation happens before the first row is touched; a
//! failed call has no side effects. Durable writes go through the adapter
//! first and the in-memory index is updated only after they commit.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::grants;
use crate::membership::MembershipStore;
use crate::prelude::*;
use crate::resolver::{AccessOptions, AccessResolver};
use crate::roles::RoleCatalog;
use crate::settings::{EngineSettings, RoleSpec};
use crate::tree::HierarchyTree;
use liege_types::directory::{ResourceDirectory, UserDirectory};
use liege_types::realm_adapter::{NewRole, RealmAdapter};

#[derive(Debug)]
struct State {
	tree: HierarchyTree,
	catalog: RoleCatalog,
	default_role: RoleId,
}

/// The access engine.
///
/// Construct one per realm with [`Engine::new`]; it is cheap to share behind
/// an `Arc` and safe to call from concurrent tasks.
#[derive(Debug)]
pub struct Engine {
	adapter: Arc<dyn RealmAdapter>,
	users: Arc<dyn UserDirectory>,
	resources: Arc<dyn ResourceDirectory>,
	members: MembershipStore,
	settings: EngineSettings,
	state: RwLock<State>,
}

impl Engine {
	/// Loads persisted roles and nodes, rebuilds the closure index, and
	/// ensures the configured default role exists.
	pub async fn new(
		adapter: Arc<dyn RealmAdapter>,
		users: Arc<dyn UserDirectory>,
		resources: Arc<dyn ResourceDirectory>,
		settings: EngineSettings,
	) -> LgResult<Self> {
		let mut catalog = RoleCatalog::from_roles(adapter.list_roles().await?);
		let default_role = ensure_in(&*adapter, &mut catalog, &settings.default_role).await?;
		let tree = HierarchyTree::from_nodes(adapter.list_nodes().await?)?;
		info!("engine ready: {} nodes, default role '{}'", tree.len(), settings.default_role.name);

		Ok(Self {
			members: MembershipStore::new(Arc::clone(&adapter)),
			adapter,
			users,
			resources,
			settings,
			state: RwLock::new(State { tree, catalog, default_role }),
		})
	}

	pub fn settings(&self) -> &EngineSettings {
		&self.settings
	}

	// Role catalog
	//**************

	/// Idempotent find-or-create from a configuration triple
	pub async fn ensure_role(&self, spec: &RoleSpec) -> LgResult<Role> {
		let mut state = self.state.write().await;
		let role_id = ensure_in(&*self.adapter, &mut state.catalog, spec).await?;
		state.catalog.get(role_id).cloned().ok_or_else(|| Error::Internal("role vanished".into()))
	}

	/// Defines a new role; fails with `DuplicateRoleName` if the name is
	/// taken. `escalates_to` names the role this one is treated as when
	/// inherited access is filtered by role name.
	pub async fn define_role(
		&self,
		name: &str,
		level: i32,
		inherited: bool,
		escalates_to: Option<&str>,
	) -> LgResult<Role> {
		let mut state = self.state.write().await;
		if state.catalog.find_by_name(name).is_some() {
			return Err(Error::DuplicateRoleName(name.into()));
		}
		let escalates_to = match escalates_to {
			Some(target) => Some(
				state
					.catalog
					.find_by_name(target)
					.ok_or_else(|| Error::RoleNotFound(target.into()))?
					.role_id,
			),
			None => None,
		};
		let role =
			self.adapter.create_role(&NewRole { name, level, inherited, escalates_to }).await?;
		state.catalog.insert(role.clone());
		info!("defined role '{}' (level {}, inherited {})", name, level, inherited);
		Ok(role)
	}

	pub async fn find_role(&self, name: &str) -> Option<Role> {
		self.state.read().await.catalog.find_by_name(name).cloned()
	}

	// Node lifecycle, driven by the resource store
	//**********************************************

	/// Creates the hierarchy node for a freshly created resource. Idempotent:
	/// a resource that already has its node gets it back unchanged.
	pub async fn resource_created(
		&self,
		resource: &ResourceRef,
		parent: Option<&ResourceRef>,
	) -> LgResult<NodeId> {
		self.require_resource(resource).await?;

		let mut state = self.state.write().await;
		if let Some(existing) = state.tree.node_of_resource(resource) {
			return Ok(existing);
		}
		let parent_node = match parent {
			Some(parent_res) => Some(hierarchy_node(&state, &*self.resources, parent_res)?),
			None => None,
		};
		let node = self.adapter.create_node(parent_node, resource).await?;
		state.tree.insert(node.node_id, parent_node, resource.clone())?;
		debug!("node {} created for {}", node.node_id, resource);
		Ok(node.node_id)
	}

	/// Removes the resource's node and every member at it. Descendant nodes
	/// stay; their removal is driven by their own resources.
	pub async fn resource_destroyed(&self, resource: &ResourceRef) -> LgResult<()> {
		if !self.resources.is_hierarchical(&resource.typ) {
			return Err(Error::NotAResource(resource.clone()));
		}
		let mut state = self.state.write().await;
		let node_id =
			state.tree.node_of_resource(resource).ok_or(Error::NilHierarchy)?;
		self.adapter.delete_node(node_id).await?;
		state.tree.remove(node_id)?;
		debug!("node {} removed for {}", node_id, resource);
		Ok(())
	}

	/// Moves the resource's node (and its subtree) under a new parent, or to
	/// the roots. Fails with `Cycle`, before anything is written, when the
	/// target lies inside the moved subtree.
	pub async fn reparent_resource(
		&self,
		resource: &ResourceRef,
		new_parent: Option<&ResourceRef>,
	) -> LgResult<()> {
		self.require_resource(resource).await?;

		let mut state = self.state.write().await;
		let node_id = resource_node(&state, &*self.resources, resource)?;
		let parent_node = match new_parent {
			Some(parent_res) => Some(hierarchy_node(&state, &*self.resources, parent_res)?),
			None => None,
		};
		if let Some(target) = parent_node {
			if target == node_id || state.tree.is_ancestor(node_id, target) {
				return Err(Error::Cycle);
			}
		}
		self.adapter.update_node_parent(node_id, parent_node).await?;
		state.tree.reparent(node_id, parent_node)?;
		debug!("node {} reparented under {:?}", node_id, parent_node);
		Ok(())
	}

	pub async fn node_of_resource(&self, resource: &ResourceRef) -> Option<NodeId> {
		self.state.read().await.tree.node_of_resource(resource)
	}

	// Access resolution
	//*******************

	/// The set of nodes the user can reach, under the given options. One
	/// adapter round-trip regardless of tree size.
	pub async fn accessible_nodes(
		&self,
		user: Option<UserId>,
		opts: &AccessOptions,
	) -> LgResult<HashSet<NodeId>> {
		let user_id = self.require_user(user).await?;
		let state = self.state.read().await;
		let memberships = self.adapter.list_user_members(user_id).await?;
		AccessResolver::new(&state.tree, &state.catalog).accessible_nodes(&memberships, opts)
	}

	/// The subtree of the given resource: its node plus all descendants
	pub async fn nodes_within(&self, root: Option<&ResourceRef>) -> LgResult<HashSet<NodeId>> {
		let root = root.ok_or(Error::NilHierarchy)?;
		let state = self.state.read().await;
		let node_id = hierarchy_node(&state, &*self.resources, root)?;
		state.tree.nodes_within(node_id)
	}

	/// `accessible_nodes` restricted to the subtree of `root`, resolved
	/// against one snapshot. Equals the set intersection of the two parts in
	/// either order.
	pub async fn accessible_nodes_within(
		&self,
		user: Option<UserId>,
		root: Option<&ResourceRef>,
		opts: &AccessOptions,
	) -> LgResult<HashSet<NodeId>> {
		let user_id = self.require_user(user).await?;
		let root = root.ok_or(Error::NilHierarchy)?;
		let state = self.state.read().await;
		let node_id = hierarchy_node(&state, &*self.resources, root)?;
		let memberships = self.adapter.list_user_members(user_id).await?;
		let accessible = AccessResolver::new(&state.tree, &state.catalog)
			.accessible_nodes(&memberships, opts)?;
		let within = state.tree.nodes_within(node_id)?;
		Ok(accessible.intersection(&within).copied().collect())
	}

	/// Every member the user may see at or under the given resource: members
	/// in subtrees the user holds an inheriting role over, and members at the
	/// exact nodes of the user's non-inheriting grants. Bounded adapter
	/// round-trips (two) regardless of tree size.
	pub async fn members_visible_to(
		&self,
		user: Option<UserId>,
		at: Option<&ResourceRef>,
	) -> LgResult<Vec<Member>> {
		let user_id = self.require_user(user).await?;
		let at = at.ok_or(Error::NilResource)?;
		let state = self.state.read().await;
		let node_id = resource_node(&state, &*self.resources, at)?;

		let memberships = self.adapter.list_user_members(user_id).await?;
		let managed = AccessResolver::new(&state.tree, &state.catalog)
			.manageable_nodes(&memberships)?;
		let within = state.tree.nodes_within(node_id)?;

		let mut scope: Vec<NodeId> = managed.intersection(&within).copied().collect();
		if scope.is_empty() {
			return Ok(Vec::new());
		}
		scope.sort_unstable();
		let mut visible = self.adapter.list_members_at(&scope).await?;
		visible.sort_by_key(|m| m.member_id);
		Ok(visible)
	}

	/// All roles the user holds at the resource, highest privilege first
	pub async fn roles_held_by(
		&self,
		user: UserId,
		resource: &ResourceRef,
	) -> LgResult<Vec<Role>> {
		let state = self.state.read().await;
		let node_id = resource_node(&state, &*self.resources, resource)?;
		let memberships = self.adapter.list_user_members(user).await?;
		grants::roles_held_at(&state.catalog, &state.tree, &memberships, node_id, state.default_role)
	}

	// Membership mutation
	//*********************

	/// Grants the named role at the resource's node, creating the membership
	/// if the user has none there yet.
	pub async fn grant(
		&self,
		user: UserId,
		role_name: &str,
		resource: &ResourceRef,
	) -> LgResult<Member> {
		self.require_known_user(user).await?;
		let state = self.state.write().await;
		let node_id = resource_node(&state, &*self.resources, resource)?;
		grants::grant(&self.members, &state.catalog, user, role_name, node_id).await
	}

	/// Creates a membership with the named roles; no names means the default
	/// role. Fails with `DuplicateMembership` if the user already has one at
	/// the resource's node.
	pub async fn create_membership(
		&self,
		user: UserId,
		resource: &ResourceRef,
		role_names: &[&str],
	) -> LgResult<Member> {
		self.require_known_user(user).await?;
		let state = self.state.write().await;
		let node_id = resource_node(&state, &*self.resources, resource)?;
		let mut role_ids = Vec::with_capacity(role_names.len());
		for name in role_names {
			role_ids.push(
				state
					.catalog
					.find_by_name(name)
					.ok_or_else(|| Error::RoleNotFound((*name).into()))?
					.role_id,
			);
		}
		self.members.create_membership(user, node_id, &role_ids, state.default_role).await
	}

	/// The user's membership at the resource's node, if any
	pub async fn member_at(
		&self,
		user: UserId,
		resource: &ResourceRef,
	) -> LgResult<Option<Member>> {
		let state = self.state.read().await;
		let node_id = resource_node(&state, &*self.resources, resource)?;
		self.members.member_at(user, node_id).await
	}

	/// The member's attached roles resolved against the catalog
	pub async fn roles_of(&self, member: &Member) -> Vec<Role> {
		let state = self.state.read().await;
		self.members.roles_of(member, &state.catalog)
	}

	/// Destroys the user's members at the resource's node and every node
	/// below it. Returns how many members were removed.
	pub async fn revoke_access(&self, user: UserId, resource: &ResourceRef) -> LgResult<u64> {
		self.require_known_user(user).await?;
		let state = self.state.write().await;
		let node_id = resource_node(&state, &*self.resources, resource)?;
		grants::revoke_access(&*self.adapter, &state.tree, user, node_id).await
	}

	/// Removes the named role from the user's member at the resource's node.
	/// If it was the member's only role the member is left in place with no
	/// roles; use [`Engine::revoke_role_forced`] to cascade instead.
	pub async fn revoke_role(
		&self,
		user: UserId,
		role_name: &str,
		resource: &ResourceRef,
	) -> LgResult<()> {
		self.revoke_role_impl(user, role_name, resource, false).await
	}

	/// Like [`Engine::revoke_role`], but revoking the member's only role
	/// falls through to a full [`Engine::revoke_access`].
	pub async fn revoke_role_forced(
		&self,
		user: UserId,
		role_name: &str,
		resource: &ResourceRef,
	) -> LgResult<()> {
		self.revoke_role_impl(user, role_name, resource, true).await
	}

	async fn revoke_role_impl(
		&self,
		user: UserId,
		role_name: &str,
		resource: &ResourceRef,
		force: bool,
	) -> LgResult<()> {
		self.require_known_user(user).await?;
		let state = self.state.write().await;
		let node_id = resource_node(&state, &*self.resources, resource)?;
		grants::revoke_role(
			&*self.adapter,
			&self.members,
			&state.catalog,
			&state.tree,
			user,
			role_name,
			node_id,
			force,
		)
		.await
	}

	// Validation funnels
	//********************

	async fn require_user(&self, user: Option<UserId>) -> LgResult<UserId> {
		let user_id = user.ok_or(Error::NilUser)?;
		self.require_known_user(user_id).await?;
		Ok(user_id)
	}

	async fn require_known_user(&self, user_id: UserId) -> LgResult<()> {
		if !self.users.is_valid_user(user_id).await? {
			return Err(Error::NotAUser);
		}
		Ok(())
	}

	async fn require_resource(&self, resource: &ResourceRef) -> LgResult<()> {
		if !self.resources.is_hierarchical(&resource.typ) {
			return Err(Error::NotAResource(resource.clone()));
		}
		if !self.resources.resource_exists(resource).await? {
			return Err(Error::NotAResource(resource.clone()));
		}
		Ok(())
	}
}

/// Resolves a resource argument to its node: `NotAResource` for a type the
/// resource store does not manage, `NilHierarchy` when the resource has no
/// node.
fn resource_node(
	state: &State,
	resources: &dyn ResourceDirectory,
	resource: &ResourceRef,
) -> LgResult<NodeId> {
	if !resources.is_hierarchical(&resource.typ) {
		return Err(Error::NotAResource(resource.clone()));
	}
	state.tree.node_of_resource(resource).ok_or(Error::NilHierarchy)
}

/// Same resolution for arguments naming a tree position (subtree roots,
/// parents); a foreign type surfaces as `NotAHierarchy` instead.
fn hierarchy_node(
	state: &State,
	resources: &dyn ResourceDirectory,
	resource: &ResourceRef,
) -> LgResult<NodeId> {
	if !resources.is_hierarchical(&resource.typ) {
		return Err(Error::NotAHierarchy(resource.clone()));
	}
	state.tree.node_of_resource(resource).ok_or(Error::NilHierarchy)
}

async fn ensure_in(
	adapter: &dyn RealmAdapter,
	catalog: &mut RoleCatalog,
	spec: &RoleSpec,
) -> LgResult<RoleId> {
	if let Some(role) = catalog.find_by_name(&spec.name) {
		return Ok(role.role_id);
	}
	let role = adapter
		.create_role(&NewRole {
			name: &spec.name,
			level: spec.level,
			inherited: spec.inherited,
			escalates_to: None,
		})
		.await?;
	let role_id = role.role_id;
	catalog.insert(role);
	Ok(role_id)
}

// vim: ts=4
