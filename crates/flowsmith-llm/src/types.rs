//! Core types for model interaction.
//!
//! These types are provider-agnostic; [`super::client`] translates them into
//! the Gemini or OpenAI wire formats.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions that shape model behavior.
    System,
    /// Input from the human user.
    User,
    /// Output from the model.
    Assistant,
}

/// A single message in a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,

    /// The textual content of the message.
    #[serde(default)]
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat request
// ---------------------------------------------------------------------------

/// The shape of output requested from the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free-form text.
    #[default]
    Text,
    /// A JSON document, optionally constrained by a provider-dialect schema.
    Json { schema: Option<Value> },
}

/// A full request to send to a model provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The model identifier (e.g. `"gemini-2.5-pro"`).  Empty means the
    /// client's default model.
    pub model: String,

    /// The conversation: system instructions first, then the user turn.
    pub messages: Vec<Message>,

    /// Sampling temperature (0.0 = deterministic).
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate.
    pub max_tokens: Option<u32>,

    /// Requested output shape.
    pub response_format: ResponseFormat,

    /// Reasoning token budget.  Only honoured by Gemini.
    pub thinking_budget: Option<u32>,
}

impl ChatRequest {
    /// Concatenated text of all system messages, if any.
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Token usage information returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the input (prompt).
    pub input_tokens: u32,
    /// Number of tokens generated by the model.
    pub output_tokens: u32,
}

/// The text answer of a single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// The raw model text, untouched.
    pub text: String,

    /// Why generation stopped, as reported by the provider.
    pub finish_reason: Option<String>,

    /// Token accounting, when the provider reports it.
    pub usage: Option<Usage>,
}

impl LlmResponse {
    /// A response carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
            usage: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
