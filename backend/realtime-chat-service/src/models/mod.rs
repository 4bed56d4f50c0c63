pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{Conversation, ConversationSummary};
pub use message::{Message, MessageView};
pub use user::UserSummary;
