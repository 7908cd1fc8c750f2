//! Shared test utilities for the registry.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        coupon::{self, NewCoupon},
        group::{self, NewGroup},
        shop, user,
    },
    entities,
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output to the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Creates a user with the given username.
pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<entities::user::Model> {
    user::create_user(db, username.to_string()).await
}

/// Creates an unpinned group without an access password.
pub async fn create_test_group(
    db: &DatabaseConnection,
    owner_id: i64,
    title: &str,
) -> Result<entities::group::Model> {
    group::create_group(
        db,
        owner_id,
        NewGroup {
            title: title.to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates a group protected by `password`.
pub async fn create_protected_group(
    db: &DatabaseConnection,
    owner_id: i64,
    title: &str,
    password: &str,
) -> Result<entities::group::Model> {
    group::create_group(
        db,
        owner_id,
        NewGroup {
            title: title.to_string(),
            is_pinned: false,
            access_password: Some(password.to_string()),
        },
    )
    .await
}

/// Creates a shop owned by `owner_id`.
pub async fn create_test_shop(
    db: &DatabaseConnection,
    owner_id: i64,
    title: &str,
) -> Result<entities::shop::Model> {
    shop::create_shop(db, owner_id, title).await
}

/// Creates a coupon with sensible defaults.
///
/// # Defaults
/// * `title`: None
/// * `barcode`: `"5901234123457"`
/// * `amount`: 10.00
pub async fn create_test_coupon(
    db: &DatabaseConnection,
    owner_id: i64,
    shop_id: i64,
) -> Result<entities::coupon::Model> {
    coupon::create_coupon(
        db,
        owner_id,
        NewCoupon {
            store_id: shop_id,
            title: None,
            barcode: "5901234123457".to_string(),
            amount: Decimal::new(1000, 2),
        },
    )
    .await
}

/// Sets up a test environment with user "alice" owning group "Family".
/// Returns (db, owner, group) for group-related tests.
pub async fn setup_with_group() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::group::Model,
)> {
    let db = setup_test_db().await?;
    let owner = create_test_user(&db, "alice").await?;
    let group = create_test_group(&db, owner.id, "Family").await?;
    Ok((db, owner, group))
}
