//! Database configuration module for the registry.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Tables are
//! generated from the entity definitions with `Schema::create_table_from_entity`;
//! the composite unique constraints the group workflow relies on are created as
//! separate unique indexes.

use crate::entities::{
    Coupon, Group, GroupMembership, Invitation, Shop, ShopGroup, User, group_membership,
    invitation, shop_group,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/registar.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file when the variable is not set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Unique indexes backing the (user, group), (shop, group) and
/// (group, recipient) constraints.
fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("idx_unique_group_membership")
            .table(GroupMembership)
            .col(group_membership::Column::UserId)
            .col(group_membership::Column::GroupId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_unique_shop_group")
            .table(ShopGroup)
            .col(shop_group::Column::ShopId)
            .col(shop_group::Column::GroupId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_unique_invitation")
            .table(Invitation)
            .col(invitation::Column::GroupId)
            .col(invitation::Column::RecipientId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Creates all tables and unique indexes if they do not exist yet.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Shop),
        schema.create_table_from_entity(Coupon),
        schema.create_table_from_entity(Group),
        schema.create_table_from_entity(GroupMembership),
        schema.create_table_from_entity(ShopGroup),
        schema.create_table_from_entity(Invitation),
    ];

    for table in &mut tables {
        db.execute(builder.build(table.if_not_exists())).await?;
    }

    for index in unique_indexes() {
        db.execute(builder.build(&index)).await?;
    }

    info!("Database tables and unique indexes ensured.");
    Ok(())
}
