//! SQLite-backed realm adapter.
//!
//! Stores hierarchy nodes, roles, members, and role attachments in four
//! tables. Uniqueness rules ((user, node) membership, role names, one node
//! per resource) are backed by unique indexes; compound writes run in one
//! transaction each, so an interrupted call never leaves partial rows.

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool};
use std::path::Path;

use liege::prelude::*;
use liege::realm_adapter::{Member, NewRole, Node, RealmAdapter, Role};

mod member;
mod node;
mod role;
mod schema;

// Helper functions
//******************

pub(crate) fn db_err(err: sqlx::Error) -> Error {
	warn!("DB: {:#?}", err);
	Error::DbError
}

/// Collapses `RowNotFound` into `None`, keeps other errors
pub(crate) fn opt<T>(res: Result<T, sqlx::Error>) -> LgResult<Option<T>> {
	match res {
		Ok(value) => Ok(Some(value)),
		Err(sqlx::Error::RowNotFound) => Ok(None),
		Err(err) => Err(db_err(err)),
	}
}

/// Appends a parenthesized bind list: `(?, ?, ?)`
pub(crate) fn push_in(query: &mut sqlx::QueryBuilder<'_, sqlx::Sqlite>, ids: &[i64]) {
	query.push("(");
	for (i, id) in ids.iter().enumerate() {
		if i > 0 {
			query.push(", ");
		}
		query.push_bind(*id);
	}
	query.push(")");
}

#[derive(Debug)]
pub struct RealmAdapterSqlite {
	db: SqlitePool,
}

impl RealmAdapterSqlite {
	pub async fn new(path: impl AsRef<Path>) -> LgResult<Self> {
		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.map_err(db_err)?;

		schema::init_db(&db).await.map_err(db_err)?;

		Ok(Self { db })
	}
}

#[async_trait]
impl RealmAdapter for RealmAdapterSqlite {
	// Nodes
	//*******
	async fn create_node(
		&self,
		parent_id: Option<NodeId>,
		resource: &ResourceRef,
	) -> LgResult<Node> {
		node::create(&self.db, parent_id, resource).await
	}

	async fn update_node_parent(
		&self,
		node_id: NodeId,
		parent_id: Option<NodeId>,
	) -> LgResult<()> {
		node::update_parent(&self.db, node_id, parent_id).await
	}

	async fn delete_node(&self, node_id: NodeId) -> LgResult<()> {
		node::delete(&self.db, node_id).await
	}

	async fn list_nodes(&self) -> LgResult<Vec<Node>> {
		node::list(&self.db).await
	}

	// Roles
	//*******
	async fn read_role_by_name(&self, name: &str) -> LgResult<Option<Role>> {
		role::read_by_name(&self.db, name).await
	}

	async fn create_role(&self, role: &NewRole<'_>) -> LgResult<Role> {
		role::create(&self.db, role).await
	}

	async fn list_roles(&self) -> LgResult<Vec<Role>> {
		role::list(&self.db).await
	}

	// Members
	//*********
	async fn read_member(&self, user_id: UserId, node_id: NodeId) -> LgResult<Option<Member>> {
		member::read(&self.db, user_id, node_id).await
	}

	async fn list_user_members(&self, user_id: UserId) -> LgResult<Vec<Member>> {
		member::list_for_user(&self.db, user_id).await
	}

	async fn list_members_at(&self, node_ids: &[NodeId]) -> LgResult<Vec<Member>> {
		member::list_at(&self.db, node_ids).await
	}

	async fn create_member(
		&self,
		user_id: UserId,
		node_id: NodeId,
		roles: &[RoleId],
	) -> LgResult<Member> {
		member::create(&self.db, user_id, node_id, roles).await
	}

	async fn attach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()> {
		member::attach_role(&self.db, member_id, role_id).await
	}

	async fn detach_role(&self, member_id: MemberId, role_id: RoleId) -> LgResult<()> {
		member::detach_role(&self.db, member_id, role_id).await
	}

	async fn delete_user_members_at(
		&self,
		user_id: UserId,
		node_ids: &[NodeId],
	) -> LgResult<u64> {
		member::delete_for_user_at(&self.db, user_id, node_ids).await
	}
}

// vim: ts=4
