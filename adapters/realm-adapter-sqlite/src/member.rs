//! Membership operations
//!
//! Members join against their role attachments in one query, so the engine's
//! bulk reads stay single round-trips. Creation and cascading deletion run
//! in one transaction each.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::{db_err, push_in};
use liege::prelude::*;
use liege::realm_adapter::Member;

const MEMBER_COLUMNS: &str = "m.member_id, m.user_id, m.node_id, m.created_at, mr.role_id
	FROM members m LEFT JOIN member_roles mr ON mr.member_id = m.member_id";

/// Folds joined (member, role) rows into members with role lists
fn collect(rows: &[SqliteRow]) -> LgResult<Vec<Member>> {
	let mut members: Vec<Member> = Vec::new();
	for row in rows {
		let member_id = MemberId(row.try_get("member_id").map_err(db_err)?);
		let role_id: Option<i64> = row.try_get("role_id").map_err(db_err)?;

		let idx = match members.iter().position(|m| m.member_id == member_id) {
			Some(idx) => idx,
			None => {
				members.push(Member {
					member_id,
					user_id: UserId(row.try_get("user_id").map_err(db_err)?),
					node_id: NodeId(row.try_get("node_id").map_err(db_err)?),
					roles: Vec::new(),
					created_at: Timestamp(row.try_get("created_at").map_err(db_err)?),
				});
				members.len() - 1
			}
		};
		if let (Some(role_id), Some(member)) = (role_id, members.get_mut(idx)) {
			member.roles.push(RoleId(role_id));
		}
	}
	Ok(members)
}

pub(crate) async fn read(
	db: &SqlitePool,
	user_id: UserId,
	node_id: NodeId,
) -> LgResult<Option<Member>> {
	let rows = sqlx::query(&format!(
		"SELECT {MEMBER_COLUMNS} WHERE m.user_id = ?1 AND m.node_id = ?2"
	))
	.bind(user_id.0)
	.bind(node_id.0)
	.fetch_all(db)
	.await
	.map_err(db_err)?;

	Ok(collect(&rows)?.into_iter().next())
}

pub(crate) async fn list_for_user(db: &SqlitePool, user_id: UserId) -> LgResult<Vec<Member>> {
	let rows = sqlx::query(&format!("SELECT {MEMBER_COLUMNS} WHERE m.user_id = ?1"))
		.bind(user_id.0)
		.fetch_all(db)
		.await
		.map_err(db_err)?;

	collect(&rows)
}

pub(crate) async fn list_at(db: &SqlitePool, node_ids: &[NodeId]) -> LgResult<Vec<Member>> {
	if node_ids.is_empty() {
		return Ok(Vec::new());
	}
	let ids: Vec<i64> = node_ids.iter().map(|n| n.0).collect();
	let mut query = sqlx::QueryBuilder::new(format!(
		"SELECT {MEMBER_COLUMNS} WHERE m.node_id IN "
	));
	push_in(&mut query, &ids);
	let rows = query.build().fetch_all(db).await.map_err(db_err)?;

	collect(&rows)
}

pub(crate) async fn create(
	db: &SqlitePool,
	user_id: UserId,
	node_id: NodeId,
	roles: &[RoleId],
) -> LgResult<Member> {
	let mut tx = db.begin().await.map_err(db_err)?;

	let existing = sqlx::query("SELECT member_id FROM members WHERE user_id = ?1 AND node_id = ?2")
		.bind(user_id.0)
		.bind(node_id.0)
		.fetch_optional(&mut *tx)
		.await
		.map_err(db_err)?;
	if existing.is_some() {
		return Err(Error::DuplicateMembership);
	}

	let row = sqlx::query(
		"INSERT INTO members (user_id, node_id) VALUES (?1, ?2)
		RETURNING member_id, created_at",
	)
	.bind(user_id.0)
	.bind(node_id.0)
	.fetch_one(&mut *tx)
	.await
	.map_err(db_err)?;
	let member_id = MemberId(row.try_get("member_id").map_err(db_err)?);
	let created_at = Timestamp(row.try_get("created_at").map_err(db_err)?);

	for role_id in roles {
		sqlx::query("INSERT INTO member_roles (member_id, role_id) VALUES (?1, ?2)")
			.bind(member_id.0)
			.bind(role_id.0)
			.execute(&mut *tx)
			.await
			.map_err(db_err)?;
	}

	tx.commit().await.map_err(db_err)?;
	Ok(Member { member_id, user_id, node_id, roles: roles.to_vec(), created_at })
}

pub(crate) async fn attach_role(
	db: &SqlitePool,
	member_id: MemberId,
	role_id: RoleId,
) -> LgResult<()> {
	let mut tx = db.begin().await.map_err(db_err)?;

	let member = sqlx::query("SELECT member_id FROM members WHERE member_id = ?1")
		.bind(member_id.0)
		.fetch_optional(&mut *tx)
		.await
		.map_err(db_err)?;
	if member.is_none() {
		return Err(Error::MemberNotFound);
	}

	let attached =
		sqlx::query("SELECT role_id FROM member_roles WHERE member_id = ?1 AND role_id = ?2")
			.bind(member_id.0)
			.bind(role_id.0)
			.fetch_optional(&mut *tx)
			.await
			.map_err(db_err)?;
	if attached.is_some() {
		return Err(Error::DuplicateRoleAssignment);
	}

	sqlx::query("INSERT INTO member_roles (member_id, role_id) VALUES (?1, ?2)")
		.bind(member_id.0)
		.bind(role_id.0)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;

	tx.commit().await.map_err(db_err)?;
	Ok(())
}

pub(crate) async fn detach_role(
	db: &SqlitePool,
	member_id: MemberId,
	role_id: RoleId,
) -> LgResult<()> {
	let member = sqlx::query("SELECT member_id FROM members WHERE member_id = ?1")
		.bind(member_id.0)
		.fetch_optional(db)
		.await
		.map_err(db_err)?;
	if member.is_none() {
		return Err(Error::MemberNotFound);
	}

	sqlx::query("DELETE FROM member_roles WHERE member_id = ?1 AND role_id = ?2")
		.bind(member_id.0)
		.bind(role_id.0)
		.execute(db)
		.await
		.map_err(db_err)?;
	Ok(())
}

pub(crate) async fn delete_for_user_at(
	db: &SqlitePool,
	user_id: UserId,
	node_ids: &[NodeId],
) -> LgResult<u64> {
	if node_ids.is_empty() {
		return Ok(0);
	}
	let ids: Vec<i64> = node_ids.iter().map(|n| n.0).collect();
	let mut tx = db.begin().await.map_err(db_err)?;

	let mut attachments = sqlx::QueryBuilder::new(
		"DELETE FROM member_roles WHERE member_id IN
		(SELECT member_id FROM members WHERE user_id = ",
	);
	attachments.push_bind(user_id.0);
	attachments.push(" AND node_id IN ");
	push_in(&mut attachments, &ids);
	attachments.push(")");
	attachments.build().execute(&mut *tx).await.map_err(db_err)?;

	let mut members = sqlx::QueryBuilder::new("DELETE FROM members WHERE user_id = ");
	members.push_bind(user_id.0);
	members.push(" AND node_id IN ");
	push_in(&mut members, &ids);
	let res = members.build().execute(&mut *tx).await.map_err(db_err)?;

	tx.commit().await.map_err(db_err)?;
	Ok(res.rows_affected())
}

// vim: ts=4
