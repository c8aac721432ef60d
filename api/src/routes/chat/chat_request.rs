use contextor::ChatTurn;
use serde::{Deserialize, Serialize};

/// Request payload for /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far; the last turn is the question.
    pub messages: Vec<ChatTurn>,
}

/// Response payload for /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Final model answer (plain text).
    pub response: String,
}
