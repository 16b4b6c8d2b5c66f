pub mod reconcile;
pub mod registration;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::UserId;

pub use reconcile::reconcile;
pub use registration::{
    create_shared_registration_manager, DmOutcome, OptInOutcome, OptOutOutcome,
    SharedRegistrationManager,
};

/// Which Kaggle competition the current contest is scored against, plus the
/// last winner-role assignment for idempotent re-runs.
#[derive(Debug, Clone, Default)]
pub struct CompetitionState {
    pub reference: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// Users holding the winner role from the previous reconciliation.
    pub winners: Vec<UserId>,
}

/// Shared competition state type
pub type SharedCompetitionState = Arc<tokio::sync::RwLock<CompetitionState>>;

pub fn create_shared_competition_state() -> SharedCompetitionState {
    Arc::new(tokio::sync::RwLock::new(CompetitionState::default()))
}
