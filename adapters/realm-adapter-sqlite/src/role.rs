//! Role catalog operations
//!
//! A handful of rows written rarely and read at startup; name uniqueness is
//! checked in the creating transaction and backed by the unique index.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::{db_err, opt};
use liege::prelude::*;
use liege::realm_adapter::{NewRole, Role};

fn row_to_role(row: &SqliteRow) -> Result<Role, sqlx::Error> {
	Ok(Role {
		role_id: RoleId(row.try_get("role_id")?),
		name: row.try_get("name")?,
		level: row.try_get("level")?,
		inherited: row.try_get("inherited")?,
		escalates_to: row.try_get::<Option<i64>, _>("escalates_to")?.map(RoleId),
	})
}

pub(crate) async fn read_by_name(db: &SqlitePool, name: &str) -> LgResult<Option<Role>> {
	let row = sqlx::query(
		"SELECT role_id, name, level, inherited, escalates_to FROM roles WHERE name = ?1",
	)
	.bind(name)
	.fetch_one(db)
	.await;

	opt(row)?.map(|row| row_to_role(&row).map_err(db_err)).transpose()
}

pub(crate) async fn create(db: &SqlitePool, role: &NewRole<'_>) -> LgResult<Role> {
	let mut tx = db.begin().await.map_err(db_err)?;

	let existing = sqlx::query("SELECT role_id FROM roles WHERE name = ?1")
		.bind(role.name)
		.fetch_optional(&mut *tx)
		.await
		.map_err(db_err)?;
	if existing.is_some() {
		return Err(Error::DuplicateRoleName(role.name.into()));
	}

	let row = sqlx::query(
		"INSERT INTO roles (name, level, inherited, escalates_to) VALUES (?1, ?2, ?3, ?4)
		RETURNING role_id, name, level, inherited, escalates_to",
	)
	.bind(role.name)
	.bind(role.level)
	.bind(role.inherited)
	.bind(role.escalates_to.map(|r| r.0))
	.fetch_one(&mut *tx)
	.await
	.map_err(db_err)?;

	tx.commit().await.map_err(db_err)?;
	row_to_role(&row).map_err(db_err)
}

pub(crate) async fn list(db: &SqlitePool) -> LgResult<Vec<Role>> {
	let rows = sqlx::query("SELECT role_id, name, level, inherited, escalates_to FROM roles")
		.fetch_all(db)
		.await
		.map_err(db_err)?;

	rows.iter().map(|row| row_to_role(row).map_err(db_err)).collect()
}

// vim: ts=4
