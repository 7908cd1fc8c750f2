//! Coupon business logic - Handles creating, redeeming and sharing coupons.
//!
//! Coupons hang off a shop. Anyone who can view the shop (its owner or a member
//! of a group the shop is linked into) can add a coupon to it, and becomes that
//! coupon's owner. Visibility of an existing coupon follows the same group
//! rosters, plus a public link once the owner shares it.

use crate::{
    core::{
        access::{self, CouponAction, ShopAction, UserId},
        barcode::{BarcodeDecoder, extract_barcode},
        group::{list_groups_for_user, rosters_for_shop},
        shop,
    },
    entities::{Coupon, ShopGroup, coupon, shop_group},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// Input for [`create_coupon`].
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub store_id: i64,
    pub title: Option<String>,
    pub barcode: String,
    pub amount: Decimal,
}

/// Input for [`create_coupon_from_image`]; the barcode is read from the image.
#[derive(Debug, Clone)]
pub struct NewCouponFromImage {
    pub store_id: i64,
    pub title: Option<String>,
    pub amount: Decimal,
}

/// Input for [`update_coupon`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CouponChanges {
    /// `Some(None)` clears the title
    pub title: Option<Option<String>>,
    pub barcode: Option<String>,
    pub amount: Option<Decimal>,
}

/// Longest accepted coupon title, in characters.
pub const MAX_TITLE_LEN: usize = 100;
/// Longest accepted barcode payload, in characters.
pub const MAX_BARCODE_LEN: usize = 200;

/// Largest amount the `DECIMAL(10, 2)` column holds: mantissa 9_999_999_999 at scale 2.
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Validates a monetary amount: non-negative, at most two decimal places and
/// no larger than 99 999 999.99.
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::InvalidAmount { amount });
    }
    let amount = amount.normalize();
    if amount.scale() > 2 || amount > MAX_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

fn validate_barcode(barcode: &str) -> Result<String> {
    let barcode = barcode.trim();
    if barcode.is_empty() {
        return Err(Error::InvalidInput {
            message: "Barcode cannot be empty".to_string(),
        });
    }
    if barcode.chars().count() > MAX_BARCODE_LEN {
        return Err(Error::InvalidInput {
            message: format!("Barcode cannot be longer than {MAX_BARCODE_LEN} characters"),
        });
    }
    Ok(barcode.to_string())
}

fn normalize_title(title: Option<String>) -> Result<Option<String>> {
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if title
        .as_ref()
        .is_some_and(|t| t.chars().count() > MAX_TITLE_LEN)
    {
        return Err(Error::InvalidInput {
            message: format!("Coupon title cannot be longer than {MAX_TITLE_LEN} characters"),
        });
    }
    Ok(title)
}

/// Loads a coupon by id or fails with [`Error::NotFound`].
pub async fn find_coupon<C>(db: &C, coupon_id: i64) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    Coupon::find_by_id(coupon_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("coupon", coupon_id))
}

async fn authorize<C>(
    db: &C,
    coupon_id: i64,
    actor: Option<UserId>,
    action: CouponAction,
) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    let coupon = find_coupon(db, coupon_id).await?;
    let rosters = rosters_for_shop(db, coupon.store_id).await?;
    access::ensure(access::can_coupon(actor, action, &coupon, &rosters))?;
    Ok(coupon)
}

/// Creates a coupon owned by `owner_id` in a shop the owner can view.
///
/// # Errors
/// - [`Error::NotFound`] if the shop does not exist
/// - [`Error::Forbidden`] if `owner_id` cannot view the shop
/// - [`Error::InvalidAmount`] if the amount is negative or has more than two decimals
/// - [`Error::InvalidInput`] if the barcode is empty
#[instrument(skip(db, new_coupon))]
pub async fn create_coupon(
    db: &DatabaseConnection,
    owner_id: UserId,
    new_coupon: NewCoupon,
) -> Result<coupon::Model> {
    let amount = validate_amount(new_coupon.amount)?;
    let barcode = validate_barcode(&new_coupon.barcode)?;
    let title = normalize_title(new_coupon.title)?;
    let (shop, _) = shop::authorize(db, new_coupon.store_id, owner_id, ShopAction::View).await?;

    let now = chrono::Utc::now();
    let coupon = coupon::ActiveModel {
        owner_id: Set(owner_id),
        store_id: Set(shop.id),
        title: Set(title),
        barcode: Set(barcode),
        is_used: Set(false),
        is_pinned: Set(false),
        is_shared: Set(false),
        amount: Set(amount),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let coupon = coupon.insert(db).await?;
    info!("User {} added coupon {} to shop {}", owner_id, coupon.id, shop.id);
    Ok(coupon)
}

/// Creates a coupon whose barcode is decoded from an uploaded image.
///
/// # Errors
/// [`Error::BarcodeNotFound`] if the decoder finds nothing, plus everything
/// [`create_coupon`] returns.
pub async fn create_coupon_from_image<D>(
    db: &DatabaseConnection,
    owner_id: UserId,
    decoder: &D,
    image: &[u8],
    input: NewCouponFromImage,
) -> Result<coupon::Model>
where
    D: BarcodeDecoder + ?Sized,
{
    let barcode = extract_barcode(decoder, image)?;
    debug!("Decoded barcode of {} byte image", image.len());
    create_coupon(
        db,
        owner_id,
        NewCoupon {
            store_id: input.store_id,
            title: input.title,
            barcode,
            amount: input.amount,
        },
    )
    .await
}

/// Returns a coupon if `actor` may view it. Anonymous actors see shared coupons only.
pub async fn get_coupon(
    db: &DatabaseConnection,
    coupon_id: i64,
    actor: Option<UserId>,
) -> Result<coupon::Model> {
    authorize(db, coupon_id, actor, CouponAction::View).await
}

/// Resolves a public coupon link. Unshared coupons look like missing ones.
pub async fn get_shared_coupon(db: &DatabaseConnection, coupon_id: i64) -> Result<coupon::Model> {
    Coupon::find_by_id(coupon_id)
        .filter(coupon::Column::IsShared.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("coupon", coupon_id))
}

/// Lists `owner_id`'s coupons: pinned first, unused before used, newest first.
pub async fn list_coupons_for_owner<C>(db: &C, owner_id: UserId) -> Result<Vec<coupon::Model>>
where
    C: ConnectionTrait,
{
    Coupon::find()
        .filter(coupon::Column::OwnerId.eq(owner_id))
        .order_by_desc(coupon::Column::IsPinned)
        .order_by_asc(coupon::Column::IsUsed)
        .order_by_desc(coupon::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the coupons of a shop `actor` can view, newest first.
///
/// Group members see every coupon in a shared shop, whoever added it.
pub async fn list_coupons_for_shop(
    db: &DatabaseConnection,
    shop_id: i64,
    actor: UserId,
) -> Result<Vec<coupon::Model>> {
    let (shop, _) = shop::authorize(db, shop_id, actor, ShopAction::View).await?;

    Coupon::find()
        .filter(coupon::Column::StoreId.eq(shop.id))
        .order_by_asc(coupon::Column::IsUsed)
        .order_by_desc(coupon::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every coupon `user_id` can see: their own plus those in shops linked
/// into any group they own or belong to.
pub async fn list_visible_coupons<C>(db: &C, user_id: UserId) -> Result<Vec<coupon::Model>>
where
    C: ConnectionTrait,
{
    let group_ids: Vec<i64> = list_groups_for_user(db, user_id)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    let shop_ids: Vec<i64> = ShopGroup::find()
        .filter(shop_group::Column::GroupId.is_in(group_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.shop_id)
        .collect();

    Coupon::find()
        .filter(
            Condition::any()
                .add(coupon::Column::OwnerId.eq(user_id))
                .add(coupon::Column::StoreId.is_in(shop_ids)),
        )
        .order_by_asc(coupon::Column::IsUsed)
        .order_by_desc(coupon::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies [`CouponChanges`]. Owner only.
pub async fn update_coupon(
    db: &DatabaseConnection,
    coupon_id: i64,
    actor: UserId,
    changes: CouponChanges,
) -> Result<coupon::Model> {
    let coupon = authorize(db, coupon_id, Some(actor), CouponAction::Update).await?;
    let mut coupon: coupon::ActiveModel = coupon.into();

    if let Some(title) = changes.title {
        coupon.title = Set(normalize_title(title)?);
    }
    if let Some(barcode) = changes.barcode {
        coupon.barcode = Set(validate_barcode(&barcode)?);
    }
    if let Some(amount) = changes.amount {
        coupon.amount = Set(validate_amount(amount)?);
    }
    coupon.updated_at = Set(chrono::Utc::now());

    coupon.update(db).await.map_err(Into::into)
}

/// Deletes a coupon. Owner only.
#[instrument(skip(db))]
pub async fn delete_coupon(db: &DatabaseConnection, coupon_id: i64, actor: UserId) -> Result<()> {
    let coupon = authorize(db, coupon_id, Some(actor), CouponAction::Delete).await?;
    coupon.delete(db).await?;
    info!("User {} deleted coupon {}", actor, coupon_id);
    Ok(())
}

async fn set_flags<F>(
    db: &DatabaseConnection,
    coupon_id: i64,
    actor: UserId,
    action: CouponAction,
    apply: F,
) -> Result<coupon::Model>
where
    F: FnOnce(&mut coupon::ActiveModel),
{
    let coupon = authorize(db, coupon_id, Some(actor), action).await?;
    let mut coupon: coupon::ActiveModel = coupon.into();
    apply(&mut coupon);
    coupon.updated_at = Set(chrono::Utc::now());
    coupon.update(db).await.map_err(Into::into)
}

/// Makes the coupon reachable through its public link.
pub async fn share_coupon(db: &DatabaseConnection, coupon_id: i64, actor: UserId) -> Result<coupon::Model> {
    set_flags(db, coupon_id, actor, CouponAction::Share, |c| c.is_shared = Set(true)).await
}

pub async fn unshare_coupon(db: &DatabaseConnection, coupon_id: i64, actor: UserId) -> Result<coupon::Model> {
    set_flags(db, coupon_id, actor, CouponAction::Unshare, |c| c.is_shared = Set(false)).await
}

/// Marks the coupon as redeemed.
pub async fn mark_used(db: &DatabaseConnection, coupon_id: i64, actor: UserId) -> Result<coupon::Model> {
    set_flags(db, coupon_id, actor, CouponAction::MarkUsed, |c| c.is_used = Set(true)).await
}

pub async fn mark_unused(db: &DatabaseConnection, coupon_id: i64, actor: UserId) -> Result<coupon::Model> {
    set_flags(db, coupon_id, actor, CouponAction::MarkUnused, |c| c.is_used = Set(false)).await
}

pub async fn pin_coupon(db: &DatabaseConnection, coupon_id: i64, actor: UserId) -> Result<coupon::Model> {
    set_flags(db, coupon_id, actor, CouponAction::Pin, |c| c.is_pinned = Set(true)).await
}

pub async fn unpin_coupon(db: &DatabaseConnection, coupon_id: i64, actor: UserId) -> Result<coupon::Model> {
    set_flags(db, coupon_id, actor, CouponAction::Unpin, |c| c.is_pinned = Set(false)).await
}
