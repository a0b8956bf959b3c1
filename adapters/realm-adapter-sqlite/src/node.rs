//! Hierarchy node operations
//!
//! Parent pointers only; the closure index lives in the engine and is
//! rebuilt from `list` at startup. Deleting a node takes its members and
//! their attachments with it in one transaction.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db_err;
use liege::prelude::*;
use liege::realm_adapter::Node;

fn row_to_node(row: &SqliteRow) -> Result<Node, sqlx::Error> {
	Ok(Node {
		node_id: NodeId(row.try_get("node_id")?),
		parent_id: row.try_get::<Option<i64>, _>("parent_id")?.map(NodeId),
		resource: ResourceRef {
			typ: row.try_get("resource_type")?,
			id: row.try_get("resource_id")?,
		},
		created_at: Timestamp(row.try_get("created_at")?),
	})
}

pub(crate) async fn create(
	db: &SqlitePool,
	parent_id: Option<NodeId>,
	resource: &ResourceRef,
) -> LgResult<Node> {
	let row = sqlx::query(
		"INSERT INTO nodes (parent_id, resource_type, resource_id) VALUES (?1, ?2, ?3)
		RETURNING node_id, parent_id, resource_type, resource_id, created_at",
	)
	.bind(parent_id.map(|p| p.0))
	.bind(resource.typ.as_ref())
	.bind(resource.id)
	.fetch_one(db)
	.await
	.map_err(db_err)?;

	row_to_node(&row).map_err(db_err)
}

pub(crate) async fn update_parent(
	db: &SqlitePool,
	node_id: NodeId,
	parent_id: Option<NodeId>,
) -> LgResult<()> {
	let res = sqlx::query("UPDATE nodes SET parent_id = ?1 WHERE node_id = ?2")
		.bind(parent_id.map(|p| p.0))
		.bind(node_id.0)
		.execute(db)
		.await
		.map_err(db_err)?;

	if res.rows_affected() == 0 {
		return Err(Error::NodeNotFound(node_id));
	}
	Ok(())
}

pub(crate) async fn delete(db: &SqlitePool, node_id: NodeId) -> LgResult<()> {
	let mut tx = db.begin().await.map_err(db_err)?;

	sqlx::query(
		"DELETE FROM member_roles WHERE member_id IN
		(SELECT member_id FROM members WHERE node_id = ?1)",
	)
	.bind(node_id.0)
	.execute(&mut *tx)
	.await
	.map_err(db_err)?;

	sqlx::query("DELETE FROM members WHERE node_id = ?1")
		.bind(node_id.0)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;

	let res = sqlx::query("DELETE FROM nodes WHERE node_id = ?1")
		.bind(node_id.0)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;
	if res.rows_affected() == 0 {
		// dropped transaction rolls the member deletes back
		return Err(Error::NodeNotFound(node_id));
	}

	tx.commit().await.map_err(db_err)?;
	Ok(())
}

pub(crate) async fn list(db: &SqlitePool) -> LgResult<Vec<Node>> {
	let rows = sqlx::query(
		"SELECT node_id, parent_id, resource_type, resource_id, created_at FROM nodes",
	)
	.fetch_all(db)
	.await
	.map_err(db_err)?;

	rows.iter().map(|row| row_to_node(row).map_err(db_err)).collect()
}

// vim: ts=4
