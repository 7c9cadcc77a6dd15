/// Inbound message shapes and conversation assembly.
///
/// The widget sends `{ messages: [{id, text, isUserMessage}, ...] }` each
/// turn; history reconstruction is the caller's job. Assembly prepends the
/// fixed system instruction and maps each message to an upstream-shaped turn.
pub mod prompt;

use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;

/// A single widget message. Caller-assigned opaque `id`, request-scoped,
/// never persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub is_user_message: bool,
}

/// Inbound request body for `POST /api/message`. Unknown keys are
/// tolerated; only missing or mistyped required fields reject.
#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    pub messages: Vec<Message>,
}

/// Role of an outbound conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One turn of the upstream-shaped conversation.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundTurn {
    pub role: Role,
    pub content: String,
}

/// The completion request sent upstream. Always streaming, always a single
/// choice; sampling parameters come from configuration, never from the caller.
#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<OutboundTurn>,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub max_tokens: u32,
    pub stream: bool,
    pub n: u32,
}

/// Map widget messages to outbound turns with the synthetic instruction turn
/// at index 0. Caller-supplied order is preserved after it.
#[must_use]
pub fn assemble_turns(messages: &[Message]) -> Vec<OutboundTurn> {
    let mut turns = Vec::with_capacity(messages.len() + 1);
    turns.push(OutboundTurn {
        role: Role::System,
        content: prompt::CHAT_INSTRUCTION.to_string(),
    });
    turns.extend(messages.iter().map(|message| OutboundTurn {
        role: if message.is_user_message {
            Role::User
        } else {
            Role::System
        },
        content: message.text.clone(),
    }));
    turns
}

/// Build the single [`CompletionRequest`] for one inbound call.
#[must_use]
pub fn build_completion_request(messages: &[Message], chat: &ChatConfig) -> CompletionRequest {
    CompletionRequest {
        model: chat.model.clone(),
        messages: assemble_turns(messages),
        temperature: chat.temperature,
        top_p: chat.top_p,
        frequency_penalty: chat.frequency_penalty,
        presence_penalty: chat.presence_penalty,
        max_tokens: chat.max_tokens,
        stream: true,
        n: 1,
    }
}
