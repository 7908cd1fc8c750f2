//! Unified error type for the registry.
//!
//! Every variant belongs to one [`ErrorKind`], which is what a web or API layer
//! should branch on when turning an error into a response.

use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; the caller can correct it and retry.
    Validation,
    /// The actor lacks permission.
    Authorization,
    /// The entity is in a state that does not allow the transition.
    InvalidState,
    /// A referenced entity does not exist.
    NotFound,
    /// Storage, configuration or hashing failure.
    Internal,
}

/// All errors produced by the registry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("User '{username}' does not exist")]
    UnknownUser { username: String },

    #[error("You cannot invite yourself")]
    CannotInviteSelf,

    #[error("User {user_id} is already a member of group {group_id}")]
    AlreadyMember { group_id: i64, user_id: i64 },

    #[error("An invitation has already been sent to user {user_id} for group {group_id}")]
    AlreadyInvited { group_id: i64, user_id: i64 },

    #[error("Access password is incorrect")]
    IncorrectAccessPassword,

    #[error("User {user_id} is not a member of group {group_id}")]
    NotAMember { group_id: i64, user_id: i64 },

    #[error("The owner of group {group_id} cannot be removed")]
    OwnerCannotBeRemoved { group_id: i64 },

    #[error("Shop {shop_id} belongs to another user")]
    NotShopOwner { shop_id: i64 },

    #[error("Shop {shop_id} is already added to group {group_id}")]
    AlreadyInGroup { group_id: i64, shop_id: i64 },

    #[error("Shop {shop_id} is not added to group {group_id}")]
    NotInGroup { group_id: i64, shop_id: i64 },

    #[error("No barcode found in the image")]
    BarcodeNotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invitation {invitation_id} has already been processed")]
    InvitationAlreadyProcessed { invitation_id: i64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a [`Error::NotFound`] for the given entity name and id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::InvalidAmount { .. }
            | Self::UnknownUser { .. }
            | Self::CannotInviteSelf
            | Self::AlreadyMember { .. }
            | Self::AlreadyInvited { .. }
            | Self::IncorrectAccessPassword
            | Self::NotAMember { .. }
            | Self::OwnerCannotBeRemoved { .. }
            | Self::NotShopOwner { .. }
            | Self::AlreadyInGroup { .. }
            | Self::NotInGroup { .. }
            | Self::BarcodeNotFound => ErrorKind::Validation,
            Self::Forbidden => ErrorKind::Authorization,
            Self::InvitationAlreadyProcessed { .. } => ErrorKind::InvalidState,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Database(_) | Self::Config { .. } | Self::PasswordHash { .. } | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
