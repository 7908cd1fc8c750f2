//! Invitation business logic - the invitation state machine.
//!
//! An invitation starts `Pending` and is processed exactly once, ending in
//! `Accepted` or `Rejected`. Transitions are planned by pure functions
//! ([`plan_accept`], [`plan_reject`]) that return the target state and an
//! ordered list of [`Effect`]s; [`apply_transition`] then executes the effects
//! inside the caller's database transaction.
//!
//! Effect order matters for `accept`: the membership row is written before the
//! invitation is marked processed, and marking is a conditional update on
//! `is_processed = false`. A second accept racing the first finds zero rows to
//! update and fails with [`Error::InvitationAlreadyProcessed`], rolling back its
//! own (idempotent) membership insert.

use crate::{
    core::{
        access::{self, GroupAction, InvitationAction, UserId},
        group::{PasswordCheck, check_access_password, find_group, roster},
        membership::{delete_membership, insert_membership, is_unique_violation},
        user,
    },
    entities::{Invitation, invitation},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of an invitation, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationState {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationState {
    /// Reads the state from the stored flags.
    #[must_use]
    pub const fn of(invitation: &invitation::Model) -> Self {
        match (invitation.is_processed, invitation.is_accepted) {
            (false, _) => Self::Pending,
            (true, true) => Self::Accepted,
            (true, false) => Self::Rejected,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A single write required by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Insert the membership row; an existing row counts as success
    AddMember { group_id: i64, user_id: UserId },
    /// Delete the membership row if present
    RemoveMember { group_id: i64, user_id: UserId },
    /// `accepted = true, processed = true, accepted_at = at, rejected_at = None`
    MarkAccepted { at: DateTime<Utc> },
    /// `accepted = false, processed = true, rejected_at = at, accepted_at = None`
    MarkRejected { at: DateTime<Utc> },
}

/// A planned state change for one invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub invitation_id: i64,
    pub from: InvitationState,
    pub to: InvitationState,
    /// Effects in the order they must be applied
    pub effects: Vec<Effect>,
}

/// Checks the actor and state shared by both transitions.
fn ensure_can_respond(invitation: &invitation::Model, actor: UserId) -> Result<()> {
    if invitation.recipient_id != actor {
        return Err(Error::Forbidden);
    }
    if InvitationState::of(invitation).is_terminal() {
        return Err(Error::InvitationAlreadyProcessed {
            invitation_id: invitation.id,
        });
    }
    Ok(())
}

/// Plans accepting an invitation.
///
/// # Errors
/// - [`Error::Forbidden`] if `actor` is not the recipient
/// - [`Error::InvitationAlreadyProcessed`] if the invitation is not pending
/// - [`Error::IncorrectAccessPassword`] if the group's password check failed
pub fn plan_accept(
    invitation: &invitation::Model,
    actor: UserId,
    password: PasswordCheck,
    now: DateTime<Utc>,
) -> Result<Transition> {
    ensure_can_respond(invitation, actor)?;
    if !password.is_satisfied() {
        return Err(Error::IncorrectAccessPassword);
    }

    Ok(Transition {
        invitation_id: invitation.id,
        from: InvitationState::Pending,
        to: InvitationState::Accepted,
        effects: vec![
            Effect::AddMember {
                group_id: invitation.group_id,
                user_id: invitation.recipient_id,
            },
            Effect::MarkAccepted { at: now },
        ],
    })
}

/// Plans rejecting an invitation.
///
/// # Errors
/// - [`Error::Forbidden`] if `actor` is not the recipient
/// - [`Error::InvitationAlreadyProcessed`] if the invitation is not pending
pub fn plan_reject(
    invitation: &invitation::Model,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Transition> {
    ensure_can_respond(invitation, actor)?;

    Ok(Transition {
        invitation_id: invitation.id,
        from: InvitationState::Pending,
        to: InvitationState::Rejected,
        effects: vec![
            Effect::RemoveMember {
                group_id: invitation.group_id,
                user_id: invitation.recipient_id,
            },
            Effect::MarkRejected { at: now },
        ],
    })
}

/// Marks an invitation processed if, and only if, it is still pending.
async fn mark_processed<C>(
    db: &C,
    invitation_id: i64,
    accepted: bool,
    at: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let (accepted_at, rejected_at) = if accepted { (Some(at), None) } else { (None, Some(at)) };

    let result = Invitation::update_many()
        .col_expr(invitation::Column::IsAccepted, Expr::value(accepted))
        .col_expr(invitation::Column::IsProcessed, Expr::value(true))
        .col_expr(invitation::Column::AcceptedAt, Expr::value(accepted_at))
        .col_expr(invitation::Column::RejectedAt, Expr::value(rejected_at))
        .filter(invitation::Column::Id.eq(invitation_id))
        .filter(invitation::Column::IsProcessed.eq(false))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::InvitationAlreadyProcessed { invitation_id });
    }
    Ok(())
}

/// Executes a planned transition in order and returns the updated invitation.
///
/// Run this inside a database transaction; on error the caller drops the
/// transaction and every effect already applied is rolled back.
pub async fn apply_transition<C>(db: &C, transition: &Transition) -> Result<invitation::Model>
where
    C: ConnectionTrait,
{
    for effect in &transition.effects {
        match *effect {
            Effect::AddMember { group_id, user_id } => {
                match insert_membership(db, group_id, user_id).await {
                    Ok(_) | Err(Error::AlreadyMember { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            Effect::RemoveMember { group_id, user_id } => {
                delete_membership(db, group_id, user_id).await?;
            }
            Effect::MarkAccepted { at } => {
                mark_processed(db, transition.invitation_id, true, at).await?;
            }
            Effect::MarkRejected { at } => {
                mark_processed(db, transition.invitation_id, false, at).await?;
            }
        }
    }

    find_invitation(db, transition.invitation_id).await
}

/// Loads an invitation by id or fails with [`Error::NotFound`].
pub async fn find_invitation<C>(db: &C, invitation_id: i64) -> Result<invitation::Model>
where
    C: ConnectionTrait,
{
    Invitation::find_by_id(invitation_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("invitation", invitation_id))
}

/// Finds the invitation row for (group, recipient), in any state.
pub async fn find_invitation_for<C>(
    db: &C,
    group_id: i64,
    recipient_id: UserId,
) -> Result<Option<invitation::Model>>
where
    C: ConnectionTrait,
{
    Invitation::find()
        .filter(invitation::Column::GroupId.eq(group_id))
        .filter(invitation::Column::RecipientId.eq(recipient_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Inserts a pending invitation without any checks. A unique index hit on
/// (group, recipient) becomes [`Error::AlreadyInvited`].
async fn insert_invitation<C>(
    db: &C,
    group_id: i64,
    sender_id: UserId,
    recipient_id: UserId,
) -> Result<invitation::Model>
where
    C: ConnectionTrait,
{
    let invitation = invitation::ActiveModel {
        group_id: Set(group_id),
        sender_id: Set(sender_id),
        recipient_id: Set(recipient_id),
        is_accepted: Set(false),
        is_processed: Set(false),
        sent_at: Set(Utc::now()),
        accepted_at: Set(None),
        rejected_at: Set(None),
        ..Default::default()
    };
    invitation.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            Error::AlreadyInvited {
                group_id,
                user_id: recipient_id,
            }
        } else {
            e.into()
        }
    })
}

/// Invites the user named `recipient_username` into the group.
///
/// A processed invitation left over for the same (group, recipient) pair, for
/// example after the recipient rejected or later left, is replaced by the new
/// pending one. A pending invitation is a hard [`Error::AlreadyInvited`].
///
/// # Errors
/// - [`Error::NotFound`] if the group does not exist
/// - [`Error::Forbidden`] if `sender_id` is not the group owner
/// - [`Error::UnknownUser`] if no user has that username
/// - [`Error::CannotInviteSelf`] if the recipient is the sender
/// - [`Error::AlreadyMember`] if the recipient already belongs to the group
/// - [`Error::AlreadyInvited`] if a pending invitation exists
#[instrument(skip(db))]
pub async fn create_invitation(
    db: &DatabaseConnection,
    group_id: i64,
    sender_id: UserId,
    recipient_username: &str,
) -> Result<invitation::Model> {
    let txn = db.begin().await?;

    let group = find_group(&txn, group_id).await?;
    let roster = roster(&txn, &group).await?;
    access::ensure(access::can_group(sender_id, GroupAction::Invite, &group, &roster))?;

    let username = recipient_username.trim();
    let recipient = user::find_user_by_username(&txn, username)
        .await?
        .ok_or_else(|| Error::UnknownUser {
            username: username.to_string(),
        })?;

    if recipient.id == sender_id {
        return Err(Error::CannotInviteSelf);
    }
    if roster.includes(recipient.id) {
        return Err(Error::AlreadyMember {
            group_id,
            user_id: recipient.id,
        });
    }

    if let Some(existing) = find_invitation_for(&txn, group_id, recipient.id).await? {
        if !existing.is_processed {
            return Err(Error::AlreadyInvited {
                group_id,
                user_id: recipient.id,
            });
        }
        debug!(
            "Replacing processed invitation {} for user {} in group {}",
            existing.id, recipient.id, group_id
        );
        existing.delete(&txn).await?;
    }

    let invitation = insert_invitation(&txn, group_id, sender_id, recipient.id).await?;

    txn.commit().await?;
    info!(
        "User {} invited user {} to group {} (invitation {})",
        sender_id, recipient.id, group_id, invitation.id
    );
    Ok(invitation)
}

/// Accepts a pending invitation, joining the recipient to the group.
///
/// For a password-protected group `password` must verify against the stored
/// hash; otherwise nothing changes and [`Error::IncorrectAccessPassword`] is
/// returned so the recipient can retry.
#[instrument(skip(db, password))]
pub async fn accept_invitation(
    db: &DatabaseConnection,
    invitation_id: i64,
    actor: UserId,
    password: Option<&str>,
) -> Result<invitation::Model> {
    let txn = db.begin().await?;

    let invitation = find_invitation(&txn, invitation_id).await?;
    ensure_can_respond(&invitation, actor)?;
    let group = find_group(&txn, invitation.group_id).await?;
    let check = check_access_password(&group, password)?;

    let transition = plan_accept(&invitation, actor, check, Utc::now()).inspect_err(|e| {
        warn!("Invitation {} not accepted by user {}: {}", invitation_id, actor, e);
    })?;
    let invitation = apply_transition(&txn, &transition).await?;

    txn.commit().await?;
    info!(
        "User {} accepted invitation {} and joined group {}",
        actor, invitation_id, invitation.group_id
    );
    Ok(invitation)
}

/// Rejects a pending invitation.
#[instrument(skip(db))]
pub async fn reject_invitation(
    db: &DatabaseConnection,
    invitation_id: i64,
    actor: UserId,
) -> Result<invitation::Model> {
    let txn = db.begin().await?;

    let invitation = find_invitation(&txn, invitation_id).await?;
    let transition = plan_reject(&invitation, actor, Utc::now())?;
    let invitation = apply_transition(&txn, &transition).await?;

    txn.commit().await?;
    info!("User {} rejected invitation {}", actor, invitation_id);
    Ok(invitation)
}

/// Returns a pending invitation to its recipient.
pub async fn get_invitation(
    db: &DatabaseConnection,
    invitation_id: i64,
    actor: UserId,
) -> Result<invitation::Model> {
    let invitation = find_invitation(db, invitation_id).await?;
    access::ensure(access::can_invitation(actor, InvitationAction::View, &invitation))?;
    Ok(invitation)
}

/// Pending invitations addressed to `recipient_id`, newest first.
pub async fn list_pending_invitations<C>(db: &C, recipient_id: UserId) -> Result<Vec<invitation::Model>>
where
    C: ConnectionTrait,
{
    Invitation::find()
        .filter(invitation::Column::RecipientId.eq(recipient_id))
        .filter(invitation::Column::IsProcessed.eq(false))
        .order_by_desc(invitation::Column::SentAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Accepted and rejected invitations of `recipient_id`, newest first.
pub async fn list_processed_invitations<C>(
    db: &C,
    recipient_id: UserId,
) -> Result<Vec<invitation::Model>>
where
    C: ConnectionTrait,
{
    Invitation::find()
        .filter(invitation::Column::RecipientId.eq(recipient_id))
        .filter(invitation::Column::IsProcessed.eq(true))
        .order_by_desc(invitation::Column::SentAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of invitations waiting for an answer from `recipient_id`.
pub async fn pending_invitation_count<C>(db: &C, recipient_id: UserId) -> Result<u64>
where
    C: ConnectionTrait,
{
    Invitation::find()
        .filter(invitation::Column::RecipientId.eq(recipient_id))
        .filter(invitation::Column::IsProcessed.eq(false))
        .count(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::membership::{self, find_membership};
    use crate::entities::GroupMembership;
    use crate::test_utils::*;

    fn pending(recipient_id: UserId) -> invitation::Model {
        invitation::Model {
            id: 7,
            group_id: 3,
            sender_id: 1,
            recipient_id,
            is_accepted: false,
            is_processed: false,
            sent_at: Utc::now(),
            accepted_at: None,
            rejected_at: None,
        }
    }

    #[test]
    fn test_state_from_flags() {
        let mut invitation = pending(2);
        assert_eq!(InvitationState::of(&invitation), InvitationState::Pending);
        invitation.is_processed = true;
        assert_eq!(InvitationState::of(&invitation), InvitationState::Rejected);
        invitation.is_accepted = true;
        assert_eq!(InvitationState::of(&invitation), InvitationState::Accepted);
        assert!(InvitationState::Accepted.is_terminal());
        assert!(!InvitationState::Pending.is_terminal());
    }

    #[test]
    fn test_plan_accept_orders_membership_before_marking() {
        let now = Utc::now();
        let transition = plan_accept(&pending(2), 2, PasswordCheck::NotRequired, now).unwrap();
        assert_eq!(transition.to, InvitationState::Accepted);
        assert_eq!(
            transition.effects,
            vec![
                Effect::AddMember {
                    group_id: 3,
                    user_id: 2
                },
                Effect::MarkAccepted { at: now },
            ]
        );
    }

    #[test]
    fn test_plan_accept_rejections() {
        let now = Utc::now();
        assert!(matches!(
            plan_accept(&pending(2), 9, PasswordCheck::NotRequired, now),
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            plan_accept(&pending(2), 2, PasswordCheck::Mismatched, now),
            Err(Error::IncorrectAccessPassword)
        ));
        assert!(matches!(
            plan_accept(&pending(2), 2, PasswordCheck::Missing, now),
            Err(Error::IncorrectAccessPassword)
        ));
        assert!(plan_accept(&pending(2), 2, PasswordCheck::Matched, now).is_ok());

        let mut processed = pending(2);
        processed.is_processed = true;
        assert!(matches!(
            plan_accept(&processed, 2, PasswordCheck::Matched, now),
            Err(Error::InvitationAlreadyProcessed { invitation_id: 7 })
        ));
        assert!(matches!(
            plan_reject(&processed, 2, now),
            Err(Error::InvitationAlreadyProcessed { invitation_id: 7 })
        ));
    }

    #[test]
    fn test_plan_reject_effects() {
        let now = Utc::now();
        let transition = plan_reject(&pending(2), 2, now).unwrap();
        assert_eq!(transition.to, InvitationState::Rejected);
        assert_eq!(
            transition.effects,
            vec![
                Effect::RemoveMember {
                    group_id: 3,
                    user_id: 2
                },
                Effect::MarkRejected { at: now },
            ]
        );
    }

    #[tokio::test]
    async fn test_invite_and_accept_without_password() -> Result<()> {
        init_test_tracing();
        let (db, owner, group) = setup_with_group().await?;
        let bob = create_test_user(&db, "bob").await?;

        let invitation = create_invitation(&db, group.id, owner.id, "bob").await?;
        assert_eq!(InvitationState::of(&invitation), InvitationState::Pending);
        assert_eq!(pending_invitation_count(&db, bob.id).await?, 1);

        let accepted = accept_invitation(&db, invitation.id, bob.id, None).await?;
        assert_eq!(InvitationState::of(&accepted), InvitationState::Accepted);
        assert!(accepted.accepted_at.is_some());
        assert!(accepted.rejected_at.is_none());
        assert!(find_membership(&db, group.id, bob.id).await?.is_some());
        assert_eq!(pending_invitation_count(&db, bob.id).await?, 0);
        assert_eq!(list_processed_invitations(&db, bob.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_password_protected_accept() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let group = create_protected_group(&db, owner.id, "Family", "secret123").await?;
        let invitation = create_invitation(&db, group.id, owner.id, "bob").await?;

        let result = accept_invitation(&db, invitation.id, bob.id, Some("wrong")).await;
        assert!(matches!(result, Err(Error::IncorrectAccessPassword)));
        let unchanged = find_invitation(&db, invitation.id).await?;
        assert_eq!(unchanged, invitation);
        assert!(find_membership(&db, group.id, bob.id).await?.is_none());

        let result = accept_invitation(&db, invitation.id, bob.id, None).await;
        assert!(matches!(result, Err(Error::IncorrectAccessPassword)));

        let accepted = accept_invitation(&db, invitation.id, bob.id, Some("secret123")).await?;
        assert_eq!(InvitationState::of(&accepted), InvitationState::Accepted);
        assert!(find_membership(&db, group.id, bob.id).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_processed_exactly_once() -> Result<()> {
        let (db, owner, group) = setup_with_group().await?;
        let bob = create_test_user(&db, "bob").await?;
        let carol = create_test_user(&db, "carol").await?;

        let first = create_invitation(&db, group.id, owner.id, "bob").await?;
        accept_invitation(&db, first.id, bob.id, None).await?;
        assert!(matches!(
            accept_invitation(&db, first.id, bob.id, None).await,
            Err(Error::InvitationAlreadyProcessed { .. })
        ));
        assert!(matches!(
            reject_invitation(&db, first.id, bob.id).await,
            Err(Error::InvitationAlreadyProcessed { .. })
        ));

        let second = create_invitation(&db, group.id, owner.id, "carol").await?;
        let rejected = reject_invitation(&db, second.id, carol.id).await?;
        assert_eq!(InvitationState::of(&rejected), InvitationState::Rejected);
        assert!(rejected.rejected_at.is_some());
        assert!(rejected.accepted_at.is_none());
        assert!(find_membership(&db, group.id, carol.id).await?.is_none());
        assert!(matches!(
            accept_invitation(&db, second.id, carol.id, None).await,
            Err(Error::InvitationAlreadyProcessed { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_only_recipient_can_respond() -> Result<()> {
        let (db, owner, group) = setup_with_group().await?;
        let _bob = create_test_user(&db, "bob").await?;
        let mallory = create_test_user(&db, "mallory").await?;
        let invitation = create_invitation(&db, group.id, owner.id, "bob").await?;

        assert!(matches!(
            accept_invitation(&db, invitation.id, mallory.id, None).await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            reject_invitation(&db, invitation.id, owner.id).await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            get_invitation(&db, invitation.id, mallory.id).await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            accept_invitation(&db, 999, mallory.id, None).await,
            Err(Error::NotFound { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_invitation_preconditions() -> Result<()> {
        let (db, owner, group) = setup_with_group().await?;
        let bob = create_test_user(&db, "bob").await?;
        let carol = create_test_user(&db, "carol").await?;
        membership::add_member(&db, group.id, carol.id, owner.id).await?;

        assert!(matches!(
            create_invitation(&db, group.id, owner.id, "nobody").await,
            Err(Error::UnknownUser { .. })
        ));
        assert!(matches!(
            create_invitation(&db, group.id, owner.id, "alice").await,
            Err(Error::CannotInviteSelf)
        ));
        assert!(matches!(
            create_invitation(&db, group.id, owner.id, "carol").await,
            Err(Error::AlreadyMember { .. })
        ));
        assert!(matches!(
            create_invitation(&db, group.id, bob.id, "carol").await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            create_invitation(&db, 999, owner.id, "bob").await,
            Err(Error::NotFound { .. })
        ));

        create_invitation(&db, group.id, owner.id, "bob").await?;
        assert!(matches!(
            create_invitation(&db, group.id, owner.id, "bob").await,
            Err(Error::AlreadyInvited { .. })
        ));
        assert_eq!(list_pending_invitations(&db, bob.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_reinvite_replaces_stale_processed_invitation() -> Result<()> {
        let (db, owner, group) = setup_with_group().await?;
        let bob = create_test_user(&db, "bob").await?;

        let first = create_invitation(&db, group.id, owner.id, "bob").await?;
        reject_invitation(&db, first.id, bob.id).await?;

        let second = create_invitation(&db, group.id, owner.id, "bob").await?;
        assert_ne!(second.id, first.id);
        assert_eq!(InvitationState::of(&second), InvitationState::Pending);
        assert!(Invitation::find_by_id(first.id).one(&db).await?.is_none());

        let accepted = accept_invitation(&db, second.id, bob.id, None).await?;
        assert_eq!(InvitationState::of(&accepted), InvitationState::Accepted);

        Ok(())
    }

    #[tokio::test]
    async fn test_stale_accept_does_not_double_join() -> Result<()> {
        let (db, owner, group) = setup_with_group().await?;
        let bob = create_test_user(&db, "bob").await?;
        let invitation = create_invitation(&db, group.id, owner.id, "bob").await?;

        // Plan against the pending snapshot, then let the other request win
        let stale = plan_accept(&invitation, bob.id, PasswordCheck::NotRequired, Utc::now())?;
        accept_invitation(&db, invitation.id, bob.id, None).await?;

        let txn = db.begin().await?;
        let result = apply_transition(&txn, &stale).await;
        assert!(matches!(
            result,
            Err(Error::InvitationAlreadyProcessed { .. })
        ));
        drop(txn);

        let rows = GroupMembership::find()
            .filter(crate::entities::group_membership::Column::UserId.eq(bob.id))
            .count(&db)
            .await?;
        assert_eq!(rows, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_invitation_for_recipient() -> Result<()> {
        let (db, owner, group) = setup_with_group().await?;
        let bob = create_test_user(&db, "bob").await?;
        let invitation = create_invitation(&db, group.id, owner.id, " bob ").await?;

        assert_eq!(get_invitation(&db, invitation.id, bob.id).await?, invitation);
        reject_invitation(&db, invitation.id, bob.id).await?;
        assert!(matches!(
            get_invitation(&db, invitation.id, bob.id).await,
            Err(Error::Forbidden)
        ));
        assert!(find_invitation_for(&db, group.id, bob.id).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_unique_index_maps_racing_invite_to_already_invited() -> Result<()> {
        let (db, owner, group) = setup_with_group().await?;
        let bob = create_test_user(&db, "bob").await?;
        create_invitation(&db, group.id, owner.id, "bob").await?;

        // A second writer that passed the pending check before the first committed
        let txn = db.begin().await?;
        let result = insert_invitation(&txn, group.id, owner.id, bob.id).await;
        assert!(matches!(
            result,
            Err(Error::AlreadyInvited { group_id, user_id }) if group_id == group.id && user_id == bob.id
        ));
        drop(txn);

        assert_eq!(pending_invitation_count(&db, bob.id).await?, 1);

        Ok(())
    }
}
