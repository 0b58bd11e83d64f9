//! Per-chat conversational state: pending confirmations, indexed list
//! context, and the bounded turn history.

pub mod confirmation;
pub mod list_context;
pub mod state;

pub use confirmation::{classify_reply, confirmation_prompt, plausible_path, ReplyKind};
pub use list_context::{resolve_reference, IndexedList, ListItem, ListKind, ListSelection};
pub use state::{
    ChatSession, ConversationTurn, Focus, PendingConfirmation, PendingPathPrompt, SessionStore,
};
