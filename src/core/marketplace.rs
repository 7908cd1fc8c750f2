//! Marketplace - shops their owners have published for anyone to copy.
//!
//! Using a listing clones the shop (title only) into the caller's account; the
//! copy starts unpinned and unlisted and shares nothing with the original.

use crate::{
    core::{
        access::{self, ListingAction, UserId},
        shop::{create_shop, find_shop},
    },
    entities::{Shop, shop},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, prelude::*};
use tracing::{info, instrument};

/// All published shops, alphabetically.
pub async fn list_listings<C>(db: &C) -> Result<Vec<shop::Model>>
where
    C: ConnectionTrait,
{
    Shop::find()
        .filter(shop::Column::IsOnMarketplace.eq(true))
        .order_by_asc(shop::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn find_listing(
    db: &DatabaseConnection,
    shop_id: i64,
    actor: UserId,
    action: ListingAction,
) -> Result<shop::Model> {
    let shop = find_shop(db, shop_id).await?;
    // Unlisted shops are indistinguishable from missing ones
    if !access::can_listing(actor, action, &shop) {
        return Err(Error::not_found("shop", shop_id));
    }
    Ok(shop)
}

/// Returns a published shop.
pub async fn get_listing(db: &DatabaseConnection, shop_id: i64, actor: UserId) -> Result<shop::Model> {
    find_listing(db, shop_id, actor, ListingAction::View).await
}

/// Copies a published shop into `actor`'s account and returns the copy.
#[instrument(skip(db))]
pub async fn use_listing(db: &DatabaseConnection, shop_id: i64, actor: UserId) -> Result<shop::Model> {
    let listing = find_listing(db, shop_id, actor, ListingAction::Use).await?;
    let copy = create_shop(db, actor, &listing.title).await?;
    info!(
        "User {} cloned marketplace shop {} as shop {}",
        actor, listing.id, copy.id
    );
    Ok(copy)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::shop::{publish_shop, set_shop_pinned, unpublish_shop};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_only_published_shops_are_listed() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let listed = create_test_shop(&db, alice.id, "Bakery").await?;
        let hidden = create_test_shop(&db, alice.id, "Private").await?;
        publish_shop(&db, listed.id, alice.id).await?;

        let listings = list_listings(&db).await?;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, listed.id);

        assert_eq!(get_listing(&db, listed.id, bob.id).await?.id, listed.id);
        let unlisted = get_listing(&db, hidden.id, bob.id).await.unwrap_err();
        let missing = get_listing(&db, 999, bob.id).await.unwrap_err();
        assert!(matches!(unlisted, Error::NotFound { .. }));
        assert!(matches!(missing, Error::NotFound { .. }));
        assert_eq!(unlisted.kind(), missing.kind());

        unpublish_shop(&db, listed.id, alice.id).await?;
        assert!(matches!(
            get_listing(&db, listed.id, bob.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(list_listings(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_use_listing_clones_shop() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let shop = create_test_shop(&db, alice.id, "Bakery").await?;
        set_shop_pinned(&db, shop.id, alice.id, true).await?;
        publish_shop(&db, shop.id, alice.id).await?;

        let copy = use_listing(&db, shop.id, bob.id).await?;
        assert_ne!(copy.id, shop.id);
        assert_eq!(copy.owner_id, bob.id);
        assert_eq!(copy.title, "Bakery");
        assert!(!copy.is_pinned);
        assert!(!copy.is_on_marketplace);

        let hidden = create_test_shop(&db, alice.id, "Private").await?;
        assert!(matches!(
            use_listing(&db, hidden.id, bob.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
