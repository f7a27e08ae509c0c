//! Conversation state for the registration flow and single-prompt dialogues.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// Per-chat conversation state
///
/// Registration advances linearly: `AwaitingNickname` →
/// `AwaitingGameId` → user row created, dialogue exits. The ticket and
/// friend prompts reuse the same machinery for a single input each.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum ChatState {
    #[default]
    Start,
    AwaitingNickname,
    AwaitingGameId {
        nickname: String,
    },
    AwaitingTicketSubject,
    AwaitingFriendNickname,
}

/// Type alias for the bot's dialogue handle
pub type ZfDialogue = Dialogue<ChatState, InMemStorage<ChatState>>;
