//! Shop business logic - Handles creating, sharing and publishing shops.
//!
//! A shop is visible to its owner and to every member of a group it is linked
//! into; only the owner may change it. Coupons and group links are removed
//! together with the shop.

use crate::{
    core::{
        access::{self, Roster, ShopAction, UserId},
        group::{list_groups_for_user, rosters_for_shop},
    },
    entities::{Coupon, Shop, ShopGroup, coupon, shop, shop_group},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Longest accepted shop title, in characters.
pub const MAX_TITLE_LEN: usize = 100;

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput {
            message: "Shop title cannot be empty".to_string(),
        });
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::InvalidInput {
            message: format!("Shop title cannot be longer than {MAX_TITLE_LEN} characters"),
        });
    }
    Ok(title.to_string())
}

/// Loads a shop by id or fails with [`Error::NotFound`].
pub async fn find_shop<C>(db: &C, shop_id: i64) -> Result<shop::Model>
where
    C: ConnectionTrait,
{
    Shop::find_by_id(shop_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("shop", shop_id))
}

/// Loads a shop and checks that `actor` may perform `action` on it.
pub(crate) async fn authorize<C>(
    db: &C,
    shop_id: i64,
    actor: UserId,
    action: ShopAction,
) -> Result<(shop::Model, Vec<Roster>)>
where
    C: ConnectionTrait,
{
    let shop = find_shop(db, shop_id).await?;
    let rosters = rosters_for_shop(db, shop.id).await?;
    access::ensure(access::can_shop(actor, action, &shop, &rosters))?;
    Ok((shop, rosters))
}

/// Creates a shop owned by `owner_id`.
///
/// # Errors
/// Returns an error if the title is empty or the insert fails.
#[instrument(skip(db))]
pub async fn create_shop(db: &DatabaseConnection, owner_id: UserId, title: &str) -> Result<shop::Model> {
    let title = validate_title(title)?;

    let now = chrono::Utc::now();
    let shop = shop::ActiveModel {
        owner_id: Set(owner_id),
        title: Set(title),
        is_pinned: Set(false),
        is_on_marketplace: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let shop = shop.insert(db).await?;
    info!("User {} created shop {}", owner_id, shop.id);
    Ok(shop)
}

/// Returns a shop if `actor` may view it.
pub async fn get_shop(db: &DatabaseConnection, shop_id: i64, actor: UserId) -> Result<shop::Model> {
    authorize(db, shop_id, actor, ShopAction::View)
        .await
        .map(|(shop, _)| shop)
}

/// Lists the shops `owner_id` owns, pinned first, then alphabetically.
pub async fn list_shops_for_owner<C>(db: &C, owner_id: UserId) -> Result<Vec<shop::Model>>
where
    C: ConnectionTrait,
{
    Shop::find()
        .filter(shop::Column::OwnerId.eq(owner_id))
        .order_by_desc(shop::Column::IsPinned)
        .order_by_asc(shop::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists shops other users shared with `user_id` through common groups.
pub async fn list_shared_shops<C>(db: &C, user_id: UserId) -> Result<Vec<shop::Model>>
where
    C: ConnectionTrait,
{
    let group_ids: Vec<i64> = list_groups_for_user(db, user_id)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let shop_ids: Vec<i64> = ShopGroup::find()
        .filter(shop_group::Column::GroupId.is_in(group_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.shop_id)
        .collect();

    Shop::find()
        .filter(shop::Column::Id.is_in(shop_ids))
        .filter(shop::Column::OwnerId.ne(user_id))
        .order_by_asc(shop::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a shop. Owner only.
pub async fn update_shop(
    db: &DatabaseConnection,
    shop_id: i64,
    actor: UserId,
    title: &str,
) -> Result<shop::Model> {
    let (shop, _) = authorize(db, shop_id, actor, ShopAction::Update).await?;
    let title = validate_title(title)?;

    let mut shop: shop::ActiveModel = shop.into();
    shop.title = Set(title);
    shop.updated_at = Set(chrono::Utc::now());
    shop.update(db).await.map_err(Into::into)
}

/// Deletes a shop with its coupons and group links. Owner only.
#[instrument(skip(db))]
pub async fn delete_shop(db: &DatabaseConnection, shop_id: i64, actor: UserId) -> Result<()> {
    let txn = db.begin().await?;
    let (shop, _) = authorize(&txn, shop_id, actor, ShopAction::Delete).await?;

    let coupons = Coupon::delete_many()
        .filter(coupon::Column::StoreId.eq(shop.id))
        .exec(&txn)
        .await?;
    ShopGroup::delete_many()
        .filter(shop_group::Column::ShopId.eq(shop.id))
        .exec(&txn)
        .await?;
    shop.delete(&txn).await?;

    txn.commit().await?;
    info!(
        "User {} deleted shop {} and {} coupon(s)",
        actor, shop_id, coupons.rows_affected
    );
    Ok(())
}

/// Sets the owner's pin on a shop.
pub async fn set_shop_pinned(
    db: &DatabaseConnection,
    shop_id: i64,
    actor: UserId,
    pinned: bool,
) -> Result<shop::Model> {
    let action = if pinned { ShopAction::Pin } else { ShopAction::Unpin };
    let (shop, _) = authorize(db, shop_id, actor, action).await?;

    let mut shop: shop::ActiveModel = shop.into();
    shop.is_pinned = Set(pinned);
    shop.updated_at = Set(chrono::Utc::now());
    shop.update(db).await.map_err(Into::into)
}

async fn set_on_marketplace(
    db: &DatabaseConnection,
    shop_id: i64,
    actor: UserId,
    listed: bool,
) -> Result<shop::Model> {
    let action = if listed { ShopAction::Publish } else { ShopAction::Unpublish };
    let (shop, _) = authorize(db, shop_id, actor, action).await?;

    let mut shop: shop::ActiveModel = shop.into();
    shop.is_on_marketplace = Set(listed);
    shop.updated_at = Set(chrono::Utc::now());
    let shop = shop.update(db).await?;
    info!("Shop {} marketplace listing set to {}", shop_id, listed);
    Ok(shop)
}

/// Lists a shop on the marketplace. Owner only.
pub async fn publish_shop(db: &DatabaseConnection, shop_id: i64, actor: UserId) -> Result<shop::Model> {
    set_on_marketplace(db, shop_id, actor, true).await
}

/// Removes a shop from the marketplace. Owner only.
pub async fn unpublish_shop(db: &DatabaseConnection, shop_id: i64, actor: UserId) -> Result<shop::Model> {
    set_on_marketplace(db, shop_id, actor, false).await
}
