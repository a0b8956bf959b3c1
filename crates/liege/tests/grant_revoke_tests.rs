//! Grant and revoke integration tests
//!
//! Membership mutation through the engine: grants, default-role assignment,
//! uniqueness errors, role queries, and the revoke cascades.

mod common;

use common::*;
use liege::prelude::*;

#[tokio::test]
async fn test_grant_creates_member_with_exactly_that_role() {
	let realm = realm().await;
	let member = realm.engine.grant(ALICE, "manager", &realm.memo3).await.expect("grant");

	assert_eq!(member.user_id, ALICE);
	let roles = realm.engine.roles_of(&member).await;
	assert_eq!(roles.len(), 1);
	assert_eq!(roles[0].name.as_ref(), "manager");
}

#[tokio::test]
async fn test_grant_attaches_to_the_existing_member() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.memo3).await.expect("grant");
	let member = realm.engine.grant(ALICE, "manager", &realm.memo3).await.expect("grant");

	assert_eq!(member.roles.len(), 2);

	// granting the same role twice surfaces the duplicate
	assert_eq!(
		realm.engine.grant(ALICE, "manager", &realm.memo3).await,
		Err(Error::DuplicateRoleAssignment)
	);
}

#[tokio::test]
async fn test_grant_validation() {
	let realm = realm().await;

	assert_eq!(
		realm.engine.grant(ALICE, "archon", &realm.memo3).await,
		Err(Error::RoleNotFound("archon".into()))
	);
	assert_eq!(
		realm.engine.grant(UserId(99), "member", &realm.memo3).await,
		Err(Error::NotAUser)
	);

	let foreign = ResourceRef::new("user", 2);
	assert_eq!(
		realm.engine.grant(ALICE, "member", &foreign).await,
		Err(Error::NotAResource(foreign.clone()))
	);
}

#[tokio::test]
async fn test_membership_without_roles_gets_the_default_role() {
	let realm = realm().await;
	let member =
		realm.engine.create_membership(ALICE, &realm.memo3, &[]).await.expect("create");

	let roles = realm.engine.roles_of(&member).await;
	assert_eq!(roles.len(), 1);
	assert_eq!(roles[0].name, realm.engine.settings().default_role.name);
}

#[tokio::test]
async fn test_duplicate_membership_rejected() {
	let realm = realm().await;
	realm.engine.create_membership(ALICE, &realm.memo3, &["member"]).await.expect("create");

	assert_eq!(
		realm.engine.create_membership(ALICE, &realm.memo3, &[]).await,
		Err(Error::DuplicateMembership)
	);
}

#[tokio::test]
async fn test_granted_role_tops_the_held_roles() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.memo3).await.expect("grant");
	realm.engine.grant(ALICE, "manager", &realm.memo3).await.expect("grant");

	let held = realm.engine.roles_held_by(ALICE, &realm.memo3).await.expect("roles");
	let names: Vec<&str> = held.iter().map(|r| r.name.as_ref()).collect();
	assert_eq!(names, vec!["manager", "member"]);
}

#[tokio::test]
async fn test_inherited_roles_count_at_descendants() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.project).await.expect("grant");
	realm.engine.grant(ALICE, "guest", &realm.memo3).await.expect("grant");

	let held = realm.engine.roles_held_by(ALICE, &realm.memo3).await.expect("roles");
	let names: Vec<&str> = held.iter().map(|r| r.name.as_ref()).collect();
	// the inheriting member role arrives from project, guest is held directly
	assert_eq!(names, vec!["member", "guest"]);
}

#[tokio::test]
async fn test_membership_below_reports_the_default_role() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.memo4).await.expect("grant");

	// no roles at project itself, but the grant below keeps it reachable
	let held = realm.engine.roles_held_by(ALICE, &realm.project).await.expect("roles");
	let names: Vec<&str> = held.iter().map(|r| r.name.as_ref()).collect();
	assert_eq!(names, vec!["guest"]);

	// an unrelated user holds nothing at all
	let held = realm.engine.roles_held_by(BOB, &realm.project).await.expect("roles");
	assert!(held.is_empty());
}

#[tokio::test]
async fn test_revoke_access_cascades_down_the_subtree() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.project).await.expect("grant");
	realm.engine.grant(ALICE, "member", &realm.memo2).await.expect("grant");
	realm.engine.grant(ALICE, "member", &realm.memo3).await.expect("grant");
	realm.engine.grant(ALICE, "member", &realm.memo4).await.expect("grant");

	let removed = realm.engine.revoke_access(ALICE, &realm.memo2).await.expect("revoke");
	assert_eq!(removed, 3);

	assert!(realm.engine.member_at(ALICE, &realm.memo2).await.expect("query").is_none());
	assert!(realm.engine.member_at(ALICE, &realm.memo4).await.expect("query").is_none());
	assert!(realm.engine.member_at(ALICE, &realm.project).await.expect("query").is_some());
}

#[tokio::test]
async fn test_revoke_role_keeps_the_member() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.memo3).await.expect("grant");
	realm.engine.grant(ALICE, "manager", &realm.memo3).await.expect("grant");

	realm.engine.revoke_role(ALICE, "manager", &realm.memo3).await.expect("revoke");

	let member =
		realm.engine.member_at(ALICE, &realm.memo3).await.expect("query").expect("member");
	let names: Vec<Box<str>> =
		realm.engine.roles_of(&member).await.into_iter().map(|r| r.name).collect();
	assert_eq!(names, vec!["member".into()]);
}

#[tokio::test]
async fn test_revoking_the_last_role_unforced_leaves_an_empty_member() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.memo3).await.expect("grant");

	realm.engine.revoke_role(ALICE, "member", &realm.memo3).await.expect("revoke");

	let member =
		realm.engine.member_at(ALICE, &realm.memo3).await.expect("query").expect("member");
	assert!(member.roles.is_empty());
}

#[tokio::test]
async fn test_revoking_the_last_role_forced_cascades_to_revoke_access() {
	let realm = realm().await;
	realm.engine.grant(ALICE, "member", &realm.memo3).await.expect("grant");
	realm.engine.grant(ALICE, "member", &realm.memo4).await.expect("grant");

	realm.engine.revoke_role_forced(ALICE, "member", &realm.memo3).await.expect("revoke");

	// the whole subtree membership goes, exactly like revoke_access
	assert!(realm.engine.member_at(ALICE, &realm.memo3).await.expect("query").is_none());
	assert!(realm.engine.member_at(ALICE, &realm.memo4).await.expect("query").is_none());
}

#[tokio::test]
async fn test_revoke_role_without_membership() {
	let realm = realm().await;
	assert_eq!(
		realm.engine.revoke_role(ALICE, "member", &realm.memo3).await,
		Err(Error::MemberNotFound)
	);
}
