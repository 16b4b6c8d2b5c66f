use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::{MessageId, UserId};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::state::{SharedIdentityStore, SharedParticipantStore};

/// The single time-boxed contest-registration invitation.
///
/// At most one is active process-wide; creating a new one discards the old
/// session together with every participant and pending conversation.
#[derive(Debug, Clone)]
pub struct PollSession {
    pub message_id: MessageId,
    pub expires_at: DateTime<Utc>,
    pub question: String,
}

impl PollSession {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Where a user is in the registration conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    /// Waiting for a yes/no reply to the participation prompt.
    AwaitingOptIn,
    /// Said yes without a stored identity; waiting for a Kaggle username.
    AwaitingKaggleId,
}

/// Transient conversational progress, scoped to the current poll. Never
/// persisted.
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub has_identity: bool,
    pub stage: RegistrationStage,
    pub started_at: DateTime<Utc>,
}

/// What an opt-in reaction leads to. The caller turns these into DMs.
#[derive(Debug, Clone, PartialEq)]
pub enum OptInOutcome {
    /// Reaction was not on the active poll message; ignore.
    NotActivePoll,
    /// Poll is past its deadline; send the rejection notice.
    PollExpired,
    /// User already holds a confirmed participant entry.
    AlreadyRegistered { kaggle_id: String },
    /// Identity on file; ask for a yes/no confirmation of it.
    PromptConfirmIdentity { kaggle_id: String },
    /// No identity on file; ask whether they want to participate at all.
    PromptParticipate,
}

/// What a DM reply leads to.
#[derive(Debug, Clone, PartialEq)]
pub enum DmOutcome {
    /// No conversation in progress for this user; ignore the message.
    NotPending,
    /// Poll expired mid-conversation; pending state was discarded.
    PollExpired,
    /// Confirmed using the identity already on file.
    ConfirmedExisting { kaggle_id: String },
    /// Confirmed with a freshly supplied identity (now persisted).
    ConfirmedNew { kaggle_id: String },
    /// Said yes without an identity; ask for the Kaggle username.
    AskKaggleId,
    /// Said no; pending state removed.
    Cancelled,
    /// Unintelligible reply; re-prompt for yes/no.
    Reprompt,
}

/// What removing the opt-in reaction leads to.
#[derive(Debug, Clone, PartialEq)]
pub enum OptOutOutcome {
    NotActivePoll,
    /// A confirmed participant entry was deleted.
    RemovedParticipant { kaggle_id: String },
    /// Only a pending conversation existed; it was cancelled.
    CancelledPending,
    /// User was neither pending nor registered; ignore.
    NotInvolved,
}

/// Drives the per-user registration conversation, gated by the active poll's
/// validity window.
///
/// Purely event-driven: every method is a transition taken in response to an
/// inbound reaction, DM or timer firing. Side effects (the DMs themselves)
/// are the caller's job and best-effort.
pub struct RegistrationManager {
    poll: tokio::sync::RwLock<Option<PollSession>>,
    pending: DashMap<UserId, PendingRegistration>,
    identities: SharedIdentityStore,
    participants: SharedParticipantStore,
    state_path: String,
}

impl RegistrationManager {
    pub fn new(
        identities: SharedIdentityStore,
        participants: SharedParticipantStore,
        state_path: &str,
    ) -> Self {
        Self {
            poll: tokio::sync::RwLock::new(None),
            pending: DashMap::new(),
            identities,
            participants,
            state_path: state_path.to_string(),
        }
    }

    pub async fn active_poll(&self) -> Option<PollSession> {
        self.poll.read().await.clone()
    }

    /// Open a new poll session. Supersedes any previous poll: all
    /// participants and pending conversations are cleared unconditionally.
    pub async fn create_poll(
        &self,
        message_id: MessageId,
        expires_at: DateTime<Utc>,
        question: &str,
    ) {
        {
            let mut participants = self.participants.write().await;
            participants.clear();
        }
        self.pending.clear();
        self.persist_participants().await;

        let session = PollSession {
            message_id,
            expires_at,
            question: question.to_string(),
        };
        *self.poll.write().await = Some(session);
        info!(
            "Contest poll {} open until {}",
            message_id, expires_at
        );
    }

    /// Poll deadline reached: drop every half-finished conversation and
    /// report the final participant count for the closing announcement.
    pub async fn expire_poll(&self) -> usize {
        self.pending.clear();
        let participants = self.participants.read().await;
        participants.len()
    }

    /// Tear down the poll and everything scoped to it (admin reset).
    pub async fn clear_all(&self) {
        *self.poll.write().await = None;
        self.pending.clear();
        {
            let mut participants = self.participants.write().await;
            participants.clear();
        }
        self.persist_participants().await;
    }

    /// An opt-in reaction landed on some message.
    pub async fn handle_opt_in(
        &self,
        user_id: UserId,
        message_id: MessageId,
        now: DateTime<Utc>,
    ) -> OptInOutcome {
        let poll = self.poll.read().await;
        let session = match poll.as_ref() {
            Some(session) if session.message_id == message_id => session,
            _ => return OptInOutcome::NotActivePoll,
        };

        if !session.is_valid(now) {
            self.pending.remove(&user_id);
            return OptInOutcome::PollExpired;
        }

        {
            let participants = self.participants.read().await;
            if participants.is_confirmed(&user_id.to_string()) {
                let kaggle_id = participants
                    .get(&user_id.to_string())
                    .map(|p| p.kaggle_id.clone())
                    .unwrap_or_default();
                return OptInOutcome::AlreadyRegistered { kaggle_id };
            }
        }

        let known_identity = {
            let identities = self.identities.read().await;
            identities.get(&user_id.to_string()).map(|i| i.kaggle_id.clone())
        };

        self.pending.insert(
            user_id,
            PendingRegistration {
                has_identity: known_identity.is_some(),
                stage: RegistrationStage::AwaitingOptIn,
                started_at: now,
            },
        );
        debug!("Started registration conversation for user {}", user_id);

        match known_identity {
            Some(kaggle_id) => OptInOutcome::PromptConfirmIdentity { kaggle_id },
            None => OptInOutcome::PromptParticipate,
        }
    }

    /// A private reply arrived from a user.
    pub async fn handle_dm_reply(
        &self,
        user_id: UserId,
        display_name: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> DmOutcome {
        let Some(pending) = self.pending.get(&user_id).map(|p| p.clone()) else {
            return DmOutcome::NotPending;
        };

        let poll_valid = self
            .poll
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.is_valid(now));
        if !poll_valid {
            self.pending.remove(&user_id);
            return DmOutcome::PollExpired;
        }

        let reply = content.trim();

        match pending.stage {
            RegistrationStage::AwaitingOptIn => {
                if is_affirmative(reply) {
                    if pending.has_identity {
                        let kaggle_id = {
                            let identities = self.identities.read().await;
                            identities
                                .get(&user_id.to_string())
                                .map(|i| i.kaggle_id.clone())
                        };
                        // Identity could have been cleared between the prompt
                        // and the reply; fall back to asking for it.
                        let Some(kaggle_id) = kaggle_id else {
                            self.set_stage(user_id, RegistrationStage::AwaitingKaggleId);
                            return DmOutcome::AskKaggleId;
                        };
                        self.confirm(user_id, display_name, &kaggle_id).await;
                        DmOutcome::ConfirmedExisting { kaggle_id }
                    } else {
                        self.set_stage(user_id, RegistrationStage::AwaitingKaggleId);
                        DmOutcome::AskKaggleId
                    }
                } else if is_negative(reply) {
                    self.pending.remove(&user_id);
                    debug!("User {} declined participation", user_id);
                    DmOutcome::Cancelled
                } else {
                    DmOutcome::Reprompt
                }
            }
            RegistrationStage::AwaitingKaggleId => {
                if reply.is_empty() {
                    return DmOutcome::Reprompt;
                }
                // Accepted literally; no validation against Kaggle
                {
                    let mut identities = self.identities.write().await;
                    identities.claim(&user_id.to_string(), display_name, reply);
                }
                self.persist_identities().await;
                self.confirm(user_id, display_name, reply).await;
                DmOutcome::ConfirmedNew {
                    kaggle_id: reply.to_string(),
                }
            }
        }
    }

    /// The opt-in reaction was retracted.
    pub async fn handle_opt_out(&self, user_id: UserId, message_id: MessageId) -> OptOutOutcome {
        let is_active_poll = self
            .poll
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.message_id == message_id);
        if !is_active_poll {
            return OptOutOutcome::NotActivePoll;
        }

        let removed = {
            let mut participants = self.participants.write().await;
            participants.remove(&user_id.to_string())
        };
        if let Some(kaggle_id) = removed {
            self.pending.remove(&user_id);
            self.persist_participants().await;
            info!("Removed user {} from contest participants", user_id);
            return OptOutOutcome::RemovedParticipant { kaggle_id };
        }

        if self.pending.remove(&user_id).is_some() {
            return OptOutOutcome::CancelledPending;
        }

        OptOutOutcome::NotInvolved
    }

    fn set_stage(&self, user_id: UserId, stage: RegistrationStage) {
        if let Some(mut pending) = self.pending.get_mut(&user_id) {
            pending.stage = stage;
        }
    }

    async fn confirm(&self, user_id: UserId, display_name: &str, kaggle_id: &str) {
        {
            let mut participants = self.participants.write().await;
            participants.confirm(&user_id.to_string(), display_name, kaggle_id);
        }
        self.pending.remove(&user_id);
        self.persist_participants().await;
        info!(
            "User {} confirmed for the contest as '{}'",
            user_id, kaggle_id
        );
    }

    // Persistence is best-effort: failures are logged and the in-memory
    // mutation stands.
    async fn persist_participants(&self) {
        let path = format!("{}/contest_participants.json", self.state_path);
        let participants = self.participants.read().await;
        if let Err(e) = participants.save(&path).await {
            error!("Failed to save participants: {}", e);
        }
    }

    async fn persist_identities(&self) {
        let path = format!("{}/kaggle_ids.json", self.state_path);
        let identities = self.identities.read().await;
        if let Err(e) = identities.save(&path).await {
            error!("Failed to save Kaggle identities: {}", e);
        }
    }
}

fn is_affirmative(reply: &str) -> bool {
    matches!(
        reply.to_lowercase().as_str(),
        "yes" | "y" | "yeah" | "yep" | "sure" | "ok" | "okay"
    )
}

fn is_negative(reply: &str) -> bool {
    matches!(
        reply.to_lowercase().as_str(),
        "no" | "n" | "nope" | "cancel" | "nah"
    )
}

/// Shared registration manager type
pub type SharedRegistrationManager = Arc<RegistrationManager>;

pub fn create_shared_registration_manager(
    identities: SharedIdentityStore,
    participants: SharedParticipantStore,
    state_path: &str,
) -> SharedRegistrationManager {
    Arc::new(RegistrationManager::new(identities, participants, state_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        create_shared_identity_store, create_shared_participant_store, IdentityStore,
        ParticipantStore,
    };
    use chrono::Duration;

    fn test_state_path() -> String {
        std::env::temp_dir()
            .join(format!("olympiad-bot-test-{}", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    async fn manager() -> RegistrationManager {
        let path = test_state_path();
        tokio::fs::create_dir_all(&path).await.ok();
        RegistrationManager::new(
            create_shared_identity_store(IdentityStore::new()),
            create_shared_participant_store(ParticipantStore::new()),
            &path,
        )
    }

    async fn open_poll(manager: &RegistrationManager, hours: i64) -> MessageId {
        let message_id = MessageId::new(1000);
        manager
            .create_poll(message_id, Utc::now() + Duration::hours(hours), "Join?")
            .await;
        message_id
    }

    #[tokio::test]
    async fn test_full_registration_without_identity() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(7);
        let now = Utc::now();

        assert_eq!(
            manager.handle_opt_in(user, poll, now).await,
            OptInOutcome::PromptParticipate
        );
        assert_eq!(
            manager.handle_dm_reply(user, "jane", "Yes", now).await,
            DmOutcome::AskKaggleId
        );
        assert_eq!(
            manager.handle_dm_reply(user, "jane", "abc123", now).await,
            DmOutcome::ConfirmedNew {
                kaggle_id: "abc123".to_string()
            }
        );

        let participants = manager.participants.read().await;
        let entry = participants.get(&user.to_string()).unwrap();
        assert_eq!(entry.kaggle_id, "abc123");
        assert!(entry.confirmed);
        drop(participants);

        // The identity claim survives alongside the participant entry
        let identities = manager.identities.read().await;
        assert_eq!(identities.get(&user.to_string()).unwrap().kaggle_id, "abc123");
    }

    #[tokio::test]
    async fn test_confirmation_with_existing_identity() {
        let manager = manager().await;
        {
            let mut identities = manager.identities.write().await;
            identities.claim("8", "bob", "bobk");
        }
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(8);
        let now = Utc::now();

        assert_eq!(
            manager.handle_opt_in(user, poll, now).await,
            OptInOutcome::PromptConfirmIdentity {
                kaggle_id: "bobk".to_string()
            }
        );
        assert_eq!(
            manager.handle_dm_reply(user, "bob", "yeah", now).await,
            DmOutcome::ConfirmedExisting {
                kaggle_id: "bobk".to_string()
            }
        );
        assert!(manager
            .participants
            .read()
            .await
            .is_confirmed(&user.to_string()));
    }

    #[tokio::test]
    async fn test_decline_and_reprompt() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(9);
        let now = Utc::now();

        manager.handle_opt_in(user, poll, now).await;
        // Garbage reply re-prompts without losing state
        assert_eq!(
            manager.handle_dm_reply(user, "kim", "maybe later", now).await,
            DmOutcome::Reprompt
        );
        assert_eq!(
            manager.handle_dm_reply(user, "kim", "nah", now).await,
            DmOutcome::Cancelled
        );
        // Conversation over: further replies are ignored
        assert_eq!(
            manager.handle_dm_reply(user, "kim", "yes", now).await,
            DmOutcome::NotPending
        );
        assert!(manager.participants.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_poll_rejects_everything() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(10);
        let now = Utc::now();

        manager.handle_opt_in(user, poll, now).await;

        let after_expiry = now + Duration::hours(3);
        assert_eq!(
            manager.handle_dm_reply(user, "sam", "yes", after_expiry).await,
            DmOutcome::PollExpired
        );
        // Pending entry discarded lazily
        assert_eq!(
            manager.handle_dm_reply(user, "sam", "yes", after_expiry).await,
            DmOutcome::NotPending
        );
        assert_eq!(
            manager.handle_opt_in(user, poll, after_expiry).await,
            OptInOutcome::PollExpired
        );
    }

    #[tokio::test]
    async fn test_reaction_on_other_messages_ignored() {
        let manager = manager().await;
        open_poll(&manager, 2).await;

        assert_eq!(
            manager
                .handle_opt_in(UserId::new(11), MessageId::new(4242), Utc::now())
                .await,
            OptInOutcome::NotActivePoll
        );
    }

    #[tokio::test]
    async fn test_opt_out_removes_participant() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(12);
        let now = Utc::now();

        manager.handle_opt_in(user, poll, now).await;
        manager.handle_dm_reply(user, "ada", "y", now).await;
        manager.handle_dm_reply(user, "ada", "ada42", now).await;

        assert_eq!(
            manager.handle_opt_out(user, poll).await,
            OptOutOutcome::RemovedParticipant {
                kaggle_id: "ada42".to_string()
            }
        );
        assert!(manager.participants.read().await.is_empty());
        assert_eq!(
            manager.handle_opt_out(user, poll).await,
            OptOutOutcome::NotInvolved
        );
    }

    #[tokio::test]
    async fn test_opt_out_cancels_pending_only() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(13);

        manager.handle_opt_in(user, poll, Utc::now()).await;
        assert_eq!(
            manager.handle_opt_out(user, poll).await,
            OptOutOutcome::CancelledPending
        );
    }

    #[tokio::test]
    async fn test_new_poll_clears_previous_state() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(14);
        let now = Utc::now();

        manager.handle_opt_in(user, poll, now).await;
        manager.handle_dm_reply(user, "eve", "yes", now).await;
        manager.handle_dm_reply(user, "eve", "eve99", now).await;
        assert_eq!(manager.participants.read().await.len(), 1);

        // New poll supersedes everything
        manager
            .create_poll(MessageId::new(2000), now + Duration::hours(1), "Round 2?")
            .await;
        assert!(manager.participants.read().await.is_empty());
        assert_eq!(
            manager.handle_dm_reply(user, "eve", "yes", now).await,
            DmOutcome::NotPending
        );
        // Identity survives the reset
        assert!(manager.identities.read().await.get(&user.to_string()).is_some());
    }

    #[tokio::test]
    async fn test_already_registered_short_circuits() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let user = UserId::new(15);
        let now = Utc::now();

        manager.handle_opt_in(user, poll, now).await;
        manager.handle_dm_reply(user, "li", "ok", now).await;
        manager.handle_dm_reply(user, "li", "li-k", now).await;

        assert_eq!(
            manager.handle_opt_in(user, poll, now).await,
            OptInOutcome::AlreadyRegistered {
                kaggle_id: "li-k".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_expire_poll_clears_pending() {
        let manager = manager().await;
        let poll = open_poll(&manager, 2).await;
        let now = Utc::now();

        manager.handle_opt_in(UserId::new(16), poll, now).await;
        manager.handle_opt_in(UserId::new(17), poll, now).await;
        let count = manager.expire_poll().await;
        assert_eq!(count, 0);
        assert_eq!(
            manager
                .handle_dm_reply(UserId::new(16), "x", "yes", now)
                .await,
            DmOutcome::NotPending
        );
    }
}
