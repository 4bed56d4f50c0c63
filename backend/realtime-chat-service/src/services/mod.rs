pub mod conversation_service;
pub mod message_service;
pub mod presence_service;
pub mod read_state;
pub mod room_service;
pub mod typing;

pub use conversation_service::ConversationService;
pub use message_service::MessageService;
pub use presence_service::PresenceService;
pub use read_state::ReadStateService;
pub use room_service::RoomService;
pub use typing::TypingService;
