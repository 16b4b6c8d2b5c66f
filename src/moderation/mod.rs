pub mod classifier;
pub mod ledger;
pub mod normalizer;
pub mod spam;

use std::sync::Arc;

pub use classifier::{ClassifierMode, ViolationClassifier};
pub use ledger::{EscalationLedger, EscalationOutcome, FlaggedMessage};
pub use spam::SpamDetector;

/// Shared moderation service types
pub type SharedEscalationLedger = Arc<tokio::sync::RwLock<EscalationLedger>>;
pub type SharedSpamDetector = Arc<tokio::sync::RwLock<SpamDetector>>;

pub fn create_shared_ledger(ledger: EscalationLedger) -> SharedEscalationLedger {
    Arc::new(tokio::sync::RwLock::new(ledger))
}

pub fn create_shared_spam_detector(detector: SpamDetector) -> SharedSpamDetector {
    Arc::new(tokio::sync::RwLock::new(detector))
}
