//! Model-call boundary for Flowsmith.
//!
//! The workflow core treats a generative model as an opaque
//! request/response collaborator.  This crate owns that boundary:
//!
//! - [`types`] -- Provider-agnostic requests, messages, and responses.
//! - [`client`] -- HTTP client for the Gemini and OpenAI APIs.
//! - [`error`] -- Model-call error types.
//!
//! Consumers depend on the [`TextGenerator`] trait rather than on
//! [`LlmClient`] directly so they can be driven by scripted generators in
//! tests.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::{LlmClient, LlmClientConfig, LlmProvider};
pub use error::{LlmError, Result};
pub use types::{ChatRequest, LlmResponse, Message, ResponseFormat, Role, Usage};

/// Anything that can turn a [`ChatRequest`] into raw model text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Issue one request and return the model's answer verbatim.
    async fn generate(&self, request: &ChatRequest) -> Result<LlmResponse>;
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, request: &ChatRequest) -> Result<LlmResponse> {
        self.chat(request).await
    }
}
