//! Multi-provider LLM client.
//!
//! Supports the **Gemini `generateContent` API** and the **OpenAI Chat
//! Completions API** (including OpenAI-compatible endpoints such as Ollama,
//! Together, and vLLM).  Only non-streaming requests are issued: callers need
//! the whole answer before they can salvage structured data from it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::error::{LlmError, Result};
use crate::types::{ChatRequest, LlmResponse, Message, ResponseFormat, Role, Usage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default Gemini API base URL.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default per-request timeout.  Reasoning models with a large thinking
/// budget routinely take more than a minute.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Provider enum
// ---------------------------------------------------------------------------

/// Identifies which LLM provider the client should target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Google Gemini `generateContent` API.
    Gemini,
    /// OpenAI Chat Completions API (also covers OpenAI-compatible endpoints).
    OpenAI,
}

impl LlmProvider {
    /// Lowercase provider name used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to a single LLM provider endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Which provider this configuration targets.
    pub provider: LlmProvider,
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Default model identifier.
    pub default_model: String,
    /// Default maximum output tokens.  `None` leaves the provider default.
    pub max_tokens: Option<u32>,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl LlmClientConfig {
    /// Create a configuration for the Gemini API.
    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_owned(),
            default_model: model.into(),
            max_tokens: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create a configuration for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_owned(),
            default_model: model.into(),
            max_tokens: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create a configuration for any OpenAI-compatible API (e.g. Ollama,
    /// Together, vLLM).
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: model.into(),
            max_tokens: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An LLM client that talks to either Gemini or an OpenAI-style endpoint.
///
/// Cheap to clone; clones share the configuration and the connection pool.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: Arc<LlmClientConfig>,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey {
                provider: config.provider.as_str().into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::RequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// Returns the configured provider.
    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    /// Returns the model used when a request leaves `model` empty.
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Send a request and return the full text answer.
    pub async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        match self.config.provider {
            LlmProvider::Gemini => self.chat_gemini(request).await,
            LlmProvider::OpenAI => self.chat_openai(request).await,
        }
    }

    fn resolve_model<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        }
    }

    /// Read a response body, turning non-success statuses into errors.
    async fn read_body(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        let text = resp.text().await.map_err(|e| LlmError::RequestFailed {
            reason: format!("failed to read response body: {e}"),
        })?;
        parse_body(status, &text)
    }

    // =======================================================================
    // Gemini implementation
    // =======================================================================

    async fn chat_gemini(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let body = self.build_gemini_request_body(request);
        let resp = self
            .send_gemini_request(self.resolve_model(request), &body)
            .await?;
        let v = Self::read_body(resp).await?;
        parse_gemini_response(&v)
    }

    /// Build the JSON body for the Gemini `generateContent` API.
    fn build_gemini_request_body(&self, request: &ChatRequest) -> Value {
        let (system_text, contents) = messages_to_gemini(&request.messages);

        let mut generation_config = json!({});

        if let Some(max_tokens) = request.max_tokens.or(self.config.max_tokens) {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        if let Some(temp) = request.temperature {
            generation_config["temperature"] = json!(temp);
        }

        if let ResponseFormat::Json { schema } = &request.response_format {
            generation_config["responseMimeType"] = json!("application/json");
            if let Some(schema) = schema {
                generation_config["responseSchema"] = schema.clone();
            }
        }

        if let Some(budget) = request.thinking_budget {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": budget });
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        if let Some(system) = system_text {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        body
    }

    async fn send_gemini_request(&self, model: &str, body: &Value) -> Result<reqwest::Response> {
        let url = format!(
            "{}/v1beta/models/{model}:generateContent",
            self.config.base_url.trim_end_matches('/')
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.config.api_key).map_err(|e| {
                LlmError::RequestFailed {
                    reason: format!("invalid API key header: {e}"),
                }
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(url = %url, model = %model, provider = "gemini", "sending LLM request");

        self.http
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(LlmError::from)
    }

    // =======================================================================
    // OpenAI implementation
    // =======================================================================

    async fn chat_openai(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let body = self.build_openai_request_body(request);
        let resp = self.send_openai_request(&body).await?;
        let v = Self::read_body(resp).await?;
        parse_openai_response(&v)
    }

    /// Build the JSON body for the OpenAI Chat Completions API.
    fn build_openai_request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.resolve_model(request),
            "messages": messages_to_openai(&request.messages),
        });

        if let Some(max_tokens) = request.max_tokens.or(self.config.max_tokens) {
            body["max_tokens"] = json!(max_tokens);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        // The Gemini schema dialect is not accepted here; JSON mode only.
        if matches!(request.response_format, ResponseFormat::Json { .. }) {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }

    async fn send_openai_request(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| LlmError::RequestFailed {
                reason: format!("invalid authorization header: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(url = %url, model = %body["model"], provider = "openai", "sending LLM request");

        self.http
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(LlmError::from)
    }
}

// ===========================================================================
// Gemini format conversion (free functions)
// ===========================================================================

/// Split system messages out (Gemini takes them as `systemInstruction`) and
/// convert the remaining turns to `contents`.
fn messages_to_gemini(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system: Option<String> = None;
    let mut contents: Vec<Value> = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => match &mut system {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(&msg.content);
                }
                None => system = Some(msg.content.clone()),
            },
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{ "text": msg.content }],
            })),
            Role::Assistant => contents.push(json!({
                "role": "model",
                "parts": [{ "text": msg.content }],
            })),
        }
    }

    (system, contents)
}

/// Parse a Gemini `generateContent` response.
///
/// Text parts of the first candidate are concatenated; thought-summary parts
/// are skipped.
pub fn parse_gemini_response(v: &Value) -> Result<LlmResponse> {
    let candidate = &v["candidates"][0];

    if candidate.is_null() {
        let reason = v["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates");
        return Err(LlmError::EmptyResponse {
            finish_reason: reason.to_owned(),
        });
    }

    let finish_reason = candidate["finishReason"].as_str().map(str::to_owned);

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter(|p| !p["thought"].as_bool().unwrap_or(false))
                .filter_map(|p| p["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse {
            finish_reason: finish_reason.unwrap_or_else(|| "unknown".into()),
        });
    }

    let metadata = &v["usageMetadata"];
    let usage = (!metadata.is_null()).then(|| Usage {
        input_tokens: metadata["promptTokenCount"].as_u64().unwrap_or(0) as u32,
        output_tokens: metadata["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
    });

    Ok(LlmResponse {
        text,
        finish_reason,
        usage,
    })
}

// ===========================================================================
// OpenAI format conversion (free functions)
// ===========================================================================

/// Convert messages to the OpenAI Chat Completions wire format.
pub fn messages_to_openai(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            json!({ "role": role, "content": msg.content })
        })
        .collect()
}

/// Parse a non-streaming OpenAI Chat Completions response.
pub fn parse_openai_response(v: &Value) -> Result<LlmResponse> {
    let choice = &v["choices"][0];
    let message = &choice["message"];

    if message.is_null() {
        return Err(LlmError::ParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    let finish_reason = choice["finish_reason"].as_str().map(str::to_owned);
    let text = message["content"].as_str().unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse {
            finish_reason: finish_reason.unwrap_or_else(|| "unknown".into()),
        });
    }

    let usage = v["usage"].as_object().map(|u| Usage {
        input_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
        output_tokens: u
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    });

    Ok(LlmResponse {
        text: text.to_owned(),
        finish_reason,
        usage,
    })
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Decode a response body, turning non-success statuses into errors.
fn parse_body(status: StatusCode, text: &str) -> Result<Value> {
    if !status.is_success() {
        return Err(LlmError::RequestFailed {
            reason: format!("API returned {status}: {text}"),
        });
    }

    Ok(serde_json::from_str(text)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn json_request(schema: Option<Value>) -> ChatRequest {
        ChatRequest {
            model: String::new(),
            messages: vec![Message::system("You are an architect."), Message::user("Design it")],
            temperature: Some(0.2),
            max_tokens: Some(2048),
            response_format: ResponseFormat::Json { schema },
            thinking_budget: Some(1024),
        }
    }

    // -- Gemini ----------------------------------------------------------------

    #[test]
    fn build_gemini_request_body_basic() {
        let client = LlmClient::new(LlmClientConfig::gemini("test-key", "gemini-2.5-pro")).unwrap();
        let schema = json!({"type": "OBJECT"});

        let body = client.build_gemini_request_body(&json_request(Some(schema.clone())));

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are an architect."
        );
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Design it");

        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"], schema);
        assert_eq!(config["thinkingConfig"]["thinkingBudget"], 1024);
        assert_eq!(config["maxOutputTokens"], 2048);
        let temp = config["temperature"].as_f64().unwrap();
        assert!((temp - 0.2).abs() < 1e-6, "temperature was {temp}");
    }

    #[test]
    fn build_gemini_request_body_text_mode_omits_json_settings() {
        let client = LlmClient::new(LlmClientConfig::gemini("test-key", "gemini-2.5-pro")).unwrap();
        let request = ChatRequest {
            model: String::new(),
            messages: vec![Message::user("Hello"), Message::assistant("Hi")],
            temperature: None,
            max_tokens: None,
            response_format: ResponseFormat::Text,
            thinking_budget: None,
        };

        let body = client.build_gemini_request_body(&request);
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
        assert_eq!(body["contents"][1]["role"], "model");
    }

    #[test]
    fn parse_gemini_text_response() {
        let v = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "{\"title\":"},
                        {"text": " \"x\"}"}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 34}
        });

        let resp = parse_gemini_response(&v).unwrap();
        assert_eq!(resp.text, "{\"title\": \"x\"}");
        assert_eq!(resp.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(
            resp.usage,
            Some(Usage {
                input_tokens: 12,
                output_tokens: 34
            })
        );
    }

    #[test]
    fn parse_gemini_blocked_prompt() {
        let v = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = parse_gemini_response(&v).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { ref finish_reason } if finish_reason == "SAFETY"));
    }

    #[test]
    fn parse_gemini_empty_text_is_error() {
        let v = json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]
        });
        let err = parse_gemini_response(&v).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    // -- OpenAI ----------------------------------------------------------------

    #[test]
    fn build_openai_request_body_basic() {
        let client = LlmClient::new(LlmClientConfig::openai("sk-test", "gpt-4o")).unwrap();

        let body = client.build_openai_request_body(&json_request(Some(json!({"type": "OBJECT"}))));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("thinkingConfig").is_none());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn openai_compatible_config_construction() {
        let config = LlmClientConfig::openai_compatible("key", "llama3", "http://localhost:11434/v1");
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn parse_openai_text_response() {
        let v = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"a\": 1}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7}
        });

        let resp = parse_openai_response(&v).unwrap();
        assert_eq!(resp.text, "{\"a\": 1}");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.unwrap().output_tokens, 7);
    }

    #[test]
    fn parse_openai_missing_message() {
        let err = parse_openai_response(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, LlmError::ParseFailed { .. }));
    }

    // -- Response bodies -------------------------------------------------------

    #[test]
    fn error_status_is_request_failure() {
        let err = parse_body(StatusCode::TOO_MANY_REQUESTS, "quota exceeded").unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { ref reason } if reason.contains("429")));
    }

    #[test]
    fn undecodable_body_is_json_error() {
        let err = parse_body(StatusCode::OK, "<html>gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
        assert!(err.to_string().starts_with("json error:"));
    }

    #[test]
    fn success_body_is_decoded() {
        let body = parse_body(StatusCode::OK, r#"{"candidates": []}"#).unwrap();
        assert_eq!(body, json!({"candidates": []}));
    }

    // -- Client ----------------------------------------------------------------

    #[test]
    fn empty_api_key_returns_error() {
        let result = LlmClient::new(LlmClientConfig::gemini("  ", "gemini-2.5-pro"));
        assert!(matches!(
            result,
            Err(LlmError::MissingApiKey { ref provider }) if provider == "gemini"
        ));
    }

    #[test]
    fn request_model_overrides_default() {
        let client = LlmClient::new(LlmClientConfig::openai("sk-test", "gpt-4o")).unwrap();
        let mut request = json_request(None);
        request.model = "gpt-4.1".into();
        assert_eq!(client.build_openai_request_body(&request)["model"], "gpt-4.1");
        assert_eq!(client.default_model(), "gpt-4o");
    }
}
