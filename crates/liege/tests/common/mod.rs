//! Common test utilities and helpers
//!
//! Shared infrastructure for the integration suite: an instrumented
//! in-memory realm adapter (with an adapter-call counter, so tests can pin
//! round-trip counts), static user/resource directories, and the standard
//! fixture realm.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use liege::directory::{ResourceDirectory, UserDirectory};
use liege::prelude::*;
use liege::realm_adapter::RealmAdapter;

pub const ALICE: UserId = UserId(1);
pub const BOB: UserId = UserId(2);
pub const CAROL: UserId = UserId(3);
pub const DAVE: UserId = UserId(4);
pub const ERIN: UserId = UserId(5);

/// In-memory realm store counting adapter calls.
#[derive(Debug, Default)]
pub struct InMemoryRealm {
	state: Mutex<RealmState>,
	calls: AtomicU64,
}

#[derive(Debug, Default)]
struct RealmState {
	next_id: i64,
	nodes: HashMap<NodeId, Node>,
	roles: Vec<Role>,
	members: Vec<Member>,
}

impl InMemoryRealm {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adapter calls made since the last reset
	pub fn calls(&self) -> u64 {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn reset_calls(&self) {
		self.calls.store(0, Ordering::SeqCst);
	}

	fn enter(&self) -> MutexGuard<'_, RealmState> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.state.lock().expect("realm state poisoned")
	}
}

#[async_trait]
impl RealmAdapter for InMemoryRealm {
	async fn create_node(
		&self,
		parent_id: Option<NodeId>,
		resource: &ResourceRef,
	) -> LgResult<Node> {
		let mut state = self.enter();
		state.next_id += 1;
		let node = Node {
			node_id: NodeId(state.next_id),
			parent_id,
			resource: resource.clone(),
			created_at: Timestamp::now(),
		};
		state.nodes.insert(node.node_id, node.clone());
		Ok(node)
	}

	async fn update_node_parent(
		&self,
		node_id: NodeId,
		parent_id: Option<NodeId>,
	) -> LgResult<()> {
		let mut state = self.enter();
		let node = state.nodes.get_mut(&node_id).ok_or(Error::NodeNotFound(node_id))?;
		node.parent_id = parent_id;
		Ok(())
	}

	async fn delete_node(&self, node_id: NodeId) -> LgResult<()> {
		let mut state = self.enter();
		state.nodes.remove(&node_id).ok_or(Error::NodeNotFound(node_id))?;
		state.members.retain(|m| m.node_id != node_id);
		Ok(())
	}

	async fn list_nodes(&self) -> LgResult<Vec<Node>> {
		Ok(self.enter().nodes.values().cloned().collect())
	}

	async fn read_role_by_name(&self, name: &str) -> LgResult<Option<Role>> {
		Ok(self.enter().roles.iter().find(|r| r.name.as_ref() == name).cloned())
	}

	async fn create_role(&self, role: &NewRole<'_>) -> LgResult<Role> {
		let mut state = self.enter();
		if state.roles.iter().any(|r| r.name.as_ref() == role.name) {
			return Err(Error::DuplicateRoleName(role.name.into()));
		}
		state.next_id += 1;
		let role = Role {
			role_id: RoleId(state.next_id),
			name: role.name.into(),
			level: role.level,
			inherited: role.inherited,
			escalates_to: role.escalates_to,
		};
		state.roles.push(role.clone());
		Ok(role)
	}

	async fn list_roles(&self) -> LgResult<Vec<Role>> {
		Ok(self.enter().roles.clone())
	}

	async fn read_member(&self, user_id: UserId, node_id: NodeId) -> LgResult<Option<Member>> {
		Ok(self
			.enter()
			.members
			.iter()
			.find(|m| m.user_id == user_id && m.node_id == node_id)
			.cloned())
	}

	async fn list_user_members(&self, user_id: UserId) -> LgResult<Vec<Member>> {
		Ok(self.enter().members.iter().filter(|m| m.user_id == user_id).cloned().collect())
	}

	async fn list_members_at(&self, node_ids: &[NodeId]) -> LgResult<Vec<Member>> {
		Ok(self
			.enter()
			.members
			.iter()
			.filter(|m| node_ids.contains(&m.node_id))
			.cloned()
			.collect())
	}

	async fn create_member(
		&self,
		user_id: UserId,
		node_id: NodeId,
		roles: &[RoleId],
	) -> LgResult<Member> {
		let mut state = self.enter();
		if state.members.iter().any(|m| m.user_id == user_id && m.node_id == node_id) {
			return Err(Error::DuplicateMembership);
		}
		state.next_id += 1;
		let member = Member {
			member_id: MemberId(state.next_id),
			user_id,
			node_id,
			roles: roles.to_vec(),
			created_at: Timestamp::now(),
		};
		state.members.push(member.clone());
		Ok(member)
	}

	async fn attach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()> {
		let mut state = self.enter();
		let member = state
			.members
			.iter_mut()
			.find(|m| m.member_id == member_id)
			.ok_or(Error::MemberNotFound)?;
		if member.roles.contains(&role_id) {
			return Err(Error::DuplicateRoleAssignment);
		}
		member.roles.push(role_id);
		Ok(())
	}

	async fn detach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()> {
		let mut state = self.enter();
		let member = state
			.members
			.iter_mut()
			.find(|m| m.member_id == member_id)
			.ok_or(Error::MemberNotFound)?;
		member.roles.retain(|r| *r != role_id);
		Ok(())
	}

	async fn delete_user_members_at(
		&self,
		user_id: UserId,
		node_ids: &[NodeId],
	) -> LgResult<u64> {
		let mut state = self.enter();
		let before = state.members.len();
		state.members.retain(|m| m.user_id != user_id || !node_ids.contains(&m.node_id));
		Ok((before - state.members.len()) as u64)
	}
}

/// User directory backed by a fixed list of known ids.
#[derive(Debug)]
pub struct StaticUsers {
	known: Vec<UserId>,
}

impl StaticUsers {
	pub fn new(known: impl IntoIterator<Item = i64>) -> Self {
		Self { known: known.into_iter().map(UserId).collect() }
	}
}

#[async_trait]
impl UserDirectory for StaticUsers {
	async fn is_valid_user(&self, user_id: UserId) -> LgResult<bool> {
		Ok(self.known.contains(&user_id))
	}
}

/// Resource directory where a fixed set of type tags is hierarchical and
/// every referenced resource exists.
#[derive(Debug)]
pub struct StaticResources {
	types: Vec<Box<str>>,
}

impl StaticResources {
	pub fn new(types: impl IntoIterator<Item = &'static str>) -> Self {
		Self { types: types.into_iter().map(Into::into).collect() }
	}
}

#[async_trait]
impl ResourceDirectory for StaticResources {
	fn is_hierarchical(&self, typ: &str) -> bool {
		self.types.iter().any(|t| t.as_ref() == typ)
	}

	async fn resource_exists(&self, _resource: &ResourceRef) -> LgResult<bool> {
		Ok(true)
	}
}

/// The standard test realm:
///
/// ```text
/// project ─┬─ memo1
///          └─ memo2 ─┬─ memo3 ─┬─ memo4
///                    │         └─ memo6
///                    └─ memo5
/// ```
///
/// Roles: guest (0, scoped, the default), member (1, inheriting),
/// manager (2, inheriting, escalates to owner), owner (3, inheriting),
/// auditor (2, scoped).
pub struct Realm {
	pub engine: Engine,
	pub adapter: Arc<InMemoryRealm>,
	pub project: ResourceRef,
	pub memo1: ResourceRef,
	pub memo2: ResourceRef,
	pub memo3: ResourceRef,
	pub memo4: ResourceRef,
	pub memo5: ResourceRef,
	pub memo6: ResourceRef,
}

pub async fn realm() -> Realm {
	let adapter = Arc::new(InMemoryRealm::new());
	let users = Arc::new(StaticUsers::new(1..=5));
	let resources = Arc::new(StaticResources::new(["project", "memo"]));
	let adapter_dyn: Arc<dyn RealmAdapter> = adapter.clone();
	let engine = Engine::new(adapter_dyn, users, resources, EngineSettings::default())
		.await
		.expect("engine construction");

	engine.define_role("owner", 3, true, None).await.expect("define owner");
	engine.define_role("manager", 2, true, Some("owner")).await.expect("define manager");
	engine.define_role("member", 1, true, None).await.expect("define member");
	engine.define_role("auditor", 2, false, None).await.expect("define auditor");

	let project = ResourceRef::new("project", 1);
	let memo1 = ResourceRef::new("memo", 1);
	let memo2 = ResourceRef::new("memo", 2);
	let memo3 = ResourceRef::new("memo", 3);
	let memo4 = ResourceRef::new("memo", 4);
	let memo5 = ResourceRef::new("memo", 5);
	let memo6 = ResourceRef::new("memo", 6);

	engine.resource_created(&project, None).await.expect("create project");
	engine.resource_created(&memo1, Some(&project)).await.expect("create memo1");
	engine.resource_created(&memo2, Some(&project)).await.expect("create memo2");
	engine.resource_created(&memo3, Some(&memo2)).await.expect("create memo3");
	engine.resource_created(&memo5, Some(&memo2)).await.expect("create memo5");
	engine.resource_created(&memo4, Some(&memo3)).await.expect("create memo4");
	engine.resource_created(&memo6, Some(&memo3)).await.expect("create memo6");

	Realm { engine, adapter, project, memo1, memo2, memo3, memo4, memo5, memo6 }
}

/// Adds extra memos under the given parent, for scaling assertions
pub async fn grow(realm: &Realm, parent: &ResourceRef, count: i64) {
	for i in 0..count {
		let memo = ResourceRef::new("memo", 1000 + i);
		realm.engine.resource_created(&memo, Some(parent)).await.expect("grow realm");
	}
}

/// Node ids of the given resources, for readable set assertions
pub async fn nodes_of(realm: &Realm, resources: &[&ResourceRef]) -> HashSet<NodeId> {
	let mut out = HashSet::new();
	for res in resources {
		out.insert(realm.engine.node_of_resource(res).await.expect("resource has a node"));
	}
	out
}
