//! Group business logic - the group aggregate and its derived queries.
//!
//! A group composes its owner, the membership rows of non-owner members and the
//! shop links. This module handles the group record itself (create, update,
//! delete, owner pin), builds [`Roster`]s for the access evaluator, and checks
//! access passwords. Member and shop mutations live in `core::membership`.

use crate::{
    core::{
        access::{self, GroupAction, Roster, UserId},
        password,
    },
    entities::{Group, GroupMembership, Invitation, ShopGroup, group, group_membership, invitation, shop_group},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Input for [`create_group`].
#[derive(Clone, Default)]
pub struct NewGroup {
    /// Display name, trimmed, must not be empty
    pub title: String,
    /// Owner's initial pin
    pub is_pinned: bool,
    /// Plaintext access password; hashed before storage. Empty means none.
    pub access_password: Option<String>,
}

/// What to do with the access password on update.
#[derive(Clone, Default)]
pub enum PasswordChange {
    /// Leave the stored hash untouched
    #[default]
    Keep,
    /// Remove the password; invitations are accepted without one
    Clear,
    /// Replace the password with a new plaintext (hashed before storage)
    Set(String),
}

/// Input for [`update_group`].
#[derive(Clone, Default)]
pub struct GroupChanges {
    /// New title, if any
    pub title: Option<String>,
    pub access_password: PasswordChange,
}

/// Outcome of checking a supplied access password against a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// The group has no access password
    NotRequired,
    /// The supplied password verifies against the stored hash
    Matched,
    /// A password was supplied but does not verify
    Mismatched,
    /// The group has a password and none was supplied
    Missing,
}

impl PasswordCheck {
    /// Whether joining may proceed.
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        matches!(self, Self::NotRequired | Self::Matched)
    }
}

/// Longest accepted group title, in characters.
pub const MAX_TITLE_LEN: usize = 100;

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput {
            message: "Group title cannot be empty".to_string(),
        });
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::InvalidInput {
            message: format!("Group title cannot be longer than {MAX_TITLE_LEN} characters"),
        });
    }
    Ok(title.to_string())
}

fn hash_optional_password(plaintext: Option<&str>) -> Result<Option<String>> {
    match plaintext {
        Some(p) if !p.is_empty() => password::hash_password(p).map(Some),
        _ => Ok(None),
    }
}

/// Loads a group by id or fails with [`Error::NotFound`].
pub async fn find_group<C>(db: &C, group_id: i64) -> Result<group::Model>
where
    C: ConnectionTrait,
{
    Group::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("group", group_id))
}

/// Builds the roster (owner plus membership rows) of a group.
pub async fn roster<C>(db: &C, group: &group::Model) -> Result<Roster>
where
    C: ConnectionTrait,
{
    let members = GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group.id))
        .all(db)
        .await?;
    Ok(Roster::new(
        group.id,
        group.owner_id,
        members.into_iter().map(|m| m.user_id),
    ))
}

/// Builds the rosters of every group a shop is linked into.
pub async fn rosters_for_shop<C>(db: &C, shop_id: i64) -> Result<Vec<Roster>>
where
    C: ConnectionTrait,
{
    let group_ids: Vec<i64> = ShopGroup::find()
        .filter(shop_group::Column::ShopId.eq(shop_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.group_id)
        .collect();

    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let groups = Group::find()
        .filter(group::Column::Id.is_in(group_ids.clone()))
        .all(db)
        .await?;
    let memberships = GroupMembership::find()
        .filter(group_membership::Column::GroupId.is_in(group_ids))
        .all(db)
        .await?;

    let mut rosters: BTreeMap<i64, Roster> = groups
        .into_iter()
        .map(|g| (g.id, Roster::new(g.id, g.owner_id, [])))
        .collect();
    for membership in memberships {
        if let Some(roster) = rosters.get_mut(&membership.group_id) {
            roster.member_ids.insert(membership.user_id);
        }
    }
    Ok(rosters.into_values().collect())
}

/// Number of non-owner members (membership rows) of a group.
pub async fn member_count<C>(db: &C, group_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Number of shops linked into a group.
pub async fn shop_count<C>(db: &C, group_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    ShopGroup::find()
        .filter(shop_group::Column::GroupId.eq(group_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Whether `user_id` may view the group.
pub async fn can_view<C>(db: &C, group: &group::Model, user_id: UserId) -> Result<bool>
where
    C: ConnectionTrait,
{
    let roster = roster(db, group).await?;
    Ok(access::can_group(user_id, GroupAction::View, group, &roster))
}

/// Checks a supplied access password against the group's stored hash.
///
/// Plaintext is never compared directly; verification goes through Argon2.
pub fn check_access_password(group: &group::Model, supplied: Option<&str>) -> Result<PasswordCheck> {
    let Some(hash) = group.access_password.as_deref() else {
        return Ok(PasswordCheck::NotRequired);
    };
    let Some(supplied) = supplied else {
        return Ok(PasswordCheck::Missing);
    };
    if password::verify_password(supplied, hash)? {
        Ok(PasswordCheck::Matched)
    } else {
        Ok(PasswordCheck::Mismatched)
    }
}

/// Loads a group and checks that `actor` may perform `action` on it.
pub(crate) async fn authorize<C>(
    db: &C,
    group_id: i64,
    actor: UserId,
    action: GroupAction,
) -> Result<(group::Model, Roster)>
where
    C: ConnectionTrait,
{
    let group = find_group(db, group_id).await?;
    let roster = roster(db, &group).await?;
    access::ensure(access::can_group(actor, action, &group, &roster))?;
    Ok((group, roster))
}

/// Creates a group owned by `owner_id`.
///
/// # Errors
/// Returns an error if the title is empty, hashing fails or the insert fails.
#[instrument(skip(db, new_group))]
pub async fn create_group(
    db: &DatabaseConnection,
    owner_id: UserId,
    new_group: NewGroup,
) -> Result<group::Model> {
    let title = validate_title(&new_group.title)?;
    let access_password = hash_optional_password(new_group.access_password.as_deref())?;

    let now = chrono::Utc::now();
    let group = group::ActiveModel {
        owner_id: Set(owner_id),
        title: Set(title),
        is_pinned: Set(new_group.is_pinned),
        access_password: Set(access_password),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let group = group.insert(db).await?;
    info!("User {} created group {}", owner_id, group.id);
    Ok(group)
}

/// Returns a group if `actor` may view it.
pub async fn get_group(db: &DatabaseConnection, group_id: i64, actor: UserId) -> Result<group::Model> {
    authorize(db, group_id, actor, GroupAction::View)
        .await
        .map(|(group, _)| group)
}

/// Lists the groups `user_id` owns or belongs to, newest first.
pub async fn list_groups_for_user<C>(db: &C, user_id: UserId) -> Result<Vec<group::Model>>
where
    C: ConnectionTrait,
{
    let member_of: Vec<i64> = GroupMembership::find()
        .filter(group_membership::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.group_id)
        .collect();

    Group::find()
        .filter(
            Condition::any()
                .add(group::Column::OwnerId.eq(user_id))
                .add(group::Column::Id.is_in(member_of)),
        )
        .order_by_desc(group::Column::CreatedAt)
        .order_by_asc(group::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Updates title and/or access password. Owner only.
#[instrument(skip(db, changes))]
pub async fn update_group(
    db: &DatabaseConnection,
    group_id: i64,
    actor: UserId,
    changes: GroupChanges,
) -> Result<group::Model> {
    let (group, _) = authorize(db, group_id, actor, GroupAction::Update).await?;
    let mut group: group::ActiveModel = group.into();

    if let Some(title) = changes.title {
        group.title = Set(validate_title(&title)?);
    }
    match changes.access_password {
        PasswordChange::Keep => {}
        PasswordChange::Clear => group.access_password = Set(None),
        PasswordChange::Set(plaintext) => {
            group.access_password = Set(hash_optional_password(Some(&plaintext))?);
        }
    }
    group.updated_at = Set(chrono::Utc::now());

    group.update(db).await.map_err(Into::into)
}

/// Sets the owner's pin on the group. Touches nothing but the flag and timestamp.
pub async fn set_group_pin(
    db: &DatabaseConnection,
    group_id: i64,
    actor: UserId,
    pinned: bool,
) -> Result<group::Model> {
    let action = if pinned { GroupAction::Pin } else { GroupAction::Unpin };
    let (group, _) = authorize(db, group_id, actor, action).await?;

    let mut group: group::ActiveModel = group.into();
    group.is_pinned = Set(pinned);
    group.updated_at = Set(chrono::Utc::now());
    group.update(db).await.map_err(Into::into)
}

/// Deletes a group together with its memberships, shop links and invitations.
#[instrument(skip(db))]
pub async fn delete_group(db: &DatabaseConnection, group_id: i64, actor: UserId) -> Result<()> {
    let txn = db.begin().await?;
    let (group, _) = authorize(&txn, group_id, actor, GroupAction::Delete).await?;

    GroupMembership::delete_many()
        .filter(group_membership::Column::GroupId.eq(group.id))
        .exec(&txn)
        .await?;
    ShopGroup::delete_many()
        .filter(shop_group::Column::GroupId.eq(group.id))
        .exec(&txn)
        .await?;
    Invitation::delete_many()
        .filter(invitation::Column::GroupId.eq(group.id))
        .exec(&txn)
        .await?;
    group.delete(&txn).await?;

    txn.commit().await?;
    info!("Group {} deleted by owner {}", group_id, actor);
    Ok(())
}
