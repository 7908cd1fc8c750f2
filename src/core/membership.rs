//! Group membership business logic - members and shared shops of a group.
//!
//! Every mutation runs inside one database transaction. Uniqueness of
//! (user, group) and (shop, group) is checked up front for a precise error and
//! backed by unique indexes; a concurrent insert that loses the race is mapped
//! to the same domain error.

use crate::{
    core::{
        access::{self, GroupAction, UserId},
        group::{authorize, find_group, roster},
        user,
    },
    entities::{
        GroupMembership, Invitation, Shop, ShopGroup, group_membership, invitation, shop,
        shop_group,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Whether a database error is a unique index violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Finds the membership row for (group, user), if any.
pub async fn find_membership<C>(
    db: &C,
    group_id: i64,
    user_id: UserId,
) -> Result<Option<group_membership::Model>>
where
    C: ConnectionTrait,
{
    GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .filter(group_membership::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the link row for (group, shop), if any.
pub async fn find_shop_link<C>(
    db: &C,
    group_id: i64,
    shop_id: i64,
) -> Result<Option<shop_group::Model>>
where
    C: ConnectionTrait,
{
    ShopGroup::find()
        .filter(shop_group::Column::GroupId.eq(group_id))
        .filter(shop_group::Column::ShopId.eq(shop_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Inserts a membership row without any authorization check.
///
/// Fails with [`Error::AlreadyMember`] if the row exists, including when the
/// unique index rejects a concurrent insert.
pub(crate) async fn insert_membership<C>(
    db: &C,
    group_id: i64,
    user_id: UserId,
) -> Result<group_membership::Model>
where
    C: ConnectionTrait,
{
    if find_membership(db, group_id, user_id).await?.is_some() {
        return Err(Error::AlreadyMember { group_id, user_id });
    }

    let membership = group_membership::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id),
        is_pinned: Set(false),
        joined_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    membership.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            Error::AlreadyMember { group_id, user_id }
        } else {
            e.into()
        }
    })
}

/// Deletes the membership row for (group, user). Returns whether a row existed.
pub(crate) async fn delete_membership<C>(db: &C, group_id: i64, user_id: UserId) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = GroupMembership::delete_many()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .filter(group_membership::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

async fn delete_invitations_for<C>(db: &C, group_id: i64, user_id: UserId) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = Invitation::delete_many()
        .filter(invitation::Column::GroupId.eq(group_id))
        .filter(invitation::Column::RecipientId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Removes a membership row and the invitation that led to it.
async fn drop_member<C>(db: &C, group_id: i64, user_id: UserId) -> Result<()>
where
    C: ConnectionTrait,
{
    if !delete_membership(db, group_id, user_id).await? {
        return Err(Error::NotAMember { group_id, user_id });
    }
    let cleaned = delete_invitations_for(db, group_id, user_id).await?;
    debug!(
        "Removed user {} from group {} ({} invitation rows cleaned up)",
        user_id, group_id, cleaned
    );
    Ok(())
}

/// Inserts a shop link without any checks. A unique index hit becomes
/// [`Error::AlreadyInGroup`].
async fn insert_shop_link<C>(
    db: &C,
    group_id: i64,
    shop_id: i64,
    pinned: bool,
) -> Result<shop_group::Model>
where
    C: ConnectionTrait,
{
    let link = shop_group::ActiveModel {
        group_id: Set(group_id),
        shop_id: Set(shop_id),
        is_pinned: Set(pinned),
        added_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    link.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            Error::AlreadyInGroup { group_id, shop_id }
        } else {
            e.into()
        }
    })
}

/// Adds `user_id` to the group directly. Owner only.
///
/// Normal joins go through invitation acceptance; this is the owner-side path.
#[instrument(skip(db))]
pub async fn add_member(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: UserId,
    actor: UserId,
) -> Result<group_membership::Model> {
    let txn = db.begin().await?;
    let (group, _) = authorize(&txn, group_id, actor, GroupAction::AddMember).await?;

    if group.owner_id == user_id {
        return Err(Error::AlreadyMember { group_id, user_id });
    }
    if user::get_user(&txn, user_id).await?.is_none() {
        return Err(Error::not_found("user", user_id));
    }

    let membership = insert_membership(&txn, group_id, user_id).await?;
    txn.commit().await?;
    info!("User {} added to group {}", user_id, group_id);
    Ok(membership)
}

/// Removes a member from the group. Owner only.
///
/// Any invitation for (group, user) is deleted along with the membership.
#[instrument(skip(db))]
pub async fn remove_member(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: UserId,
    actor: UserId,
) -> Result<()> {
    let txn = db.begin().await?;
    let (group, _) = authorize(&txn, group_id, actor, GroupAction::RemoveMember).await?;

    if group.owner_id == user_id {
        return Err(Error::OwnerCannotBeRemoved { group_id });
    }
    drop_member(&txn, group_id, user_id).await?;

    txn.commit().await?;
    info!("User {} removed from group {} by owner {}", user_id, group_id, actor);
    Ok(())
}

/// Lets a member leave the group on their own.
#[instrument(skip(db))]
pub async fn leave_group(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: UserId,
    actor: UserId,
) -> Result<()> {
    if user_id != actor {
        return Err(Error::Forbidden);
    }

    let txn = db.begin().await?;
    let group = find_group(&txn, group_id).await?;
    if group.owner_id == user_id {
        return Err(Error::OwnerCannotBeRemoved { group_id });
    }
    let roster = roster(&txn, &group).await?;
    if !roster.has_membership(user_id) {
        return Err(Error::NotAMember { group_id, user_id });
    }
    access::ensure(access::can_group(actor, GroupAction::Leave, &group, &roster))?;
    drop_member(&txn, group_id, user_id).await?;

    txn.commit().await?;
    info!("User {} left group {}", user_id, group_id);
    Ok(())
}

/// Sets the actor's own pin on their membership.
pub async fn set_member_pin(
    db: &DatabaseConnection,
    group_id: i64,
    actor: UserId,
    pinned: bool,
) -> Result<group_membership::Model> {
    authorize(db, group_id, actor, GroupAction::PinMembership).await?;

    let mut membership: group_membership::ActiveModel = find_membership(db, group_id, actor)
        .await?
        .ok_or(Error::NotAMember {
            group_id,
            user_id: actor,
        })?
        .into();
    membership.is_pinned = Set(pinned);
    membership.update(db).await.map_err(Into::into)
}

/// Lists membership rows of a group, earliest joiner first. Any member may list.
pub async fn list_members(
    db: &DatabaseConnection,
    group_id: i64,
    actor: UserId,
) -> Result<Vec<group_membership::Model>> {
    authorize(db, group_id, actor, GroupAction::View).await?;

    GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .order_by_asc(group_membership::Column::JoinedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Shares one of the actor's shops into the group. Group owner only, and the
/// shop must belong to them.
#[instrument(skip(db))]
pub async fn add_shop_to_group(
    db: &DatabaseConnection,
    group_id: i64,
    shop_id: i64,
    actor: UserId,
    pinned: bool,
) -> Result<shop_group::Model> {
    let txn = db.begin().await?;
    authorize(&txn, group_id, actor, GroupAction::AddShop).await?;

    let shop = Shop::find_by_id(shop_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("shop", shop_id))?;
    if shop.owner_id != actor {
        return Err(Error::NotShopOwner { shop_id });
    }
    if find_shop_link(&txn, group_id, shop_id).await?.is_some() {
        return Err(Error::AlreadyInGroup { group_id, shop_id });
    }

    let link = insert_shop_link(&txn, group_id, shop_id, pinned).await?;

    txn.commit().await?;
    info!("Shop {} shared into group {}", shop_id, group_id);
    Ok(link)
}

/// Unlinks a shop from the group. Group owner only. Coupons are untouched.
#[instrument(skip(db))]
pub async fn remove_shop_from_group(
    db: &DatabaseConnection,
    group_id: i64,
    shop_id: i64,
    actor: UserId,
) -> Result<()> {
    let txn = db.begin().await?;
    authorize(&txn, group_id, actor, GroupAction::RemoveShop).await?;

    let result = ShopGroup::delete_many()
        .filter(shop_group::Column::GroupId.eq(group_id))
        .filter(shop_group::Column::ShopId.eq(shop_id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotInGroup { group_id, shop_id });
    }

    txn.commit().await?;
    info!("Shop {} removed from group {}", shop_id, group_id);
    Ok(())
}

/// Sets the pin of a shop link inside the group. Group owner only.
pub async fn set_shop_pin(
    db: &DatabaseConnection,
    group_id: i64,
    shop_id: i64,
    actor: UserId,
    pinned: bool,
) -> Result<shop_group::Model> {
    authorize(db, group_id, actor, GroupAction::PinShop).await?;

    let mut link: shop_group::ActiveModel = find_shop_link(db, group_id, shop_id)
        .await?
        .ok_or(Error::NotInGroup { group_id, shop_id })?
        .into();
    link.is_pinned = Set(pinned);
    link.update(db).await.map_err(Into::into)
}

/// Lists the shops shared into a group with their link rows, pinned first.
pub async fn list_group_shops(
    db: &DatabaseConnection,
    group_id: i64,
    actor: UserId,
) -> Result<Vec<(shop_group::Model, shop::Model)>> {
    authorize(db, group_id, actor, GroupAction::View).await?;

    let rows = ShopGroup::find()
        .filter(shop_group::Column::GroupId.eq(group_id))
        .find_also_related(Shop)
        .order_by_desc(shop_group::Column::IsPinned)
        .order_by_asc(shop_group::Column::AddedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(link, shop)| shop.map(|shop| (link, shop)))
        .collect())
}
