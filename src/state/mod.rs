pub mod activity;
pub mod identity_store;
pub mod participant_store;

pub use activity::{create_shared_activity_tracker, ActivityTracker, SharedActivityTracker};
pub use identity_store::{create_shared_identity_store, IdentityStore, SharedIdentityStore};
pub use participant_store::{
    create_shared_participant_store, ContestParticipant, ParticipantStore, SharedParticipantStore,
};
