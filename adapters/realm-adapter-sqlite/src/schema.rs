//! Database schema initialization
//!
//! Creates the node, role, member, and attachment tables with the unique
//! indexes that back the engine's uniqueness errors.

use sqlx::SqlitePool;

pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Hierarchy nodes
	//*****************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS nodes (
			node_id integer PRIMARY KEY AUTOINCREMENT,
			parent_id integer,
			resource_type text NOT NULL,
			resource_id integer NOT NULL,
			created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_resource
		ON nodes(resource_type, resource_id)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)")
		.execute(&mut *tx)
		.await?;

	// Roles
	//*******
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS roles (
			role_id integer PRIMARY KEY AUTOINCREMENT,
			name text NOT NULL,
			level integer NOT NULL,
			inherited boolean NOT NULL,
			escalates_to integer
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_roles_name ON roles(name)")
		.execute(&mut *tx)
		.await?;

	// Members and their role attachments
	//************************************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS members (
			member_id integer PRIMARY KEY AUTOINCREMENT,
			user_id integer NOT NULL,
			node_id integer NOT NULL,
			created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_members_user_node
		ON members(user_id, node_id)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_members_node ON members(node_id)")
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS member_roles (
			member_id integer NOT NULL,
			role_id integer NOT NULL,
			PRIMARY KEY(member_id, role_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;
	Ok(())
}

// vim: ts=4
