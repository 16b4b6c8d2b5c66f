pub mod member;
pub mod message;
pub mod reaction;

pub use member::handle_member_add;
pub use message::handle_message;
pub use reaction::{handle_reaction_add, handle_reaction_remove};
