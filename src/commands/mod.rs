pub mod contest;
pub mod general;
pub mod moderation;

pub use contest::{clearparticipants, createcontest, leaderboard, participants, setcompetition};
pub use general::{activity, help, mykaggle, ping, setkaggle};
pub use moderation::{checkwarnings, clearwarnings, serverstats};
