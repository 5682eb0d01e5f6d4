//! Hosted chat-completions backend (`/v1/chat/completions`).
//!
//! All OpenAI wire types are private to this module. The bearer token is
//! looked up on every call so a key exported mid-session is picked up, and a
//! missing key fails the call before anything goes on the wire.

use std::env;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::transport::Transport;
use crate::llm::{DispatchError, ModelBackend, ModelResponse};

pub const BACKEND_ID: &str = "openai";

/// Where the bearer token comes from.
#[derive(Debug, Clone)]
pub enum ApiKey {
    /// Read the named environment variable at call time.
    Env(String),
    /// A key supplied directly by the caller.
    Literal(String),
}

impl ApiKey {
    fn resolve(&self) -> Result<String, DispatchError> {
        match self {
            ApiKey::Env(var) => env::var(var)
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| DispatchError::MissingCredential(var.clone())),
            ApiKey::Literal(key) => Ok(key.clone()),
        }
    }
}

pub struct OpenAiBackend {
    transport: Arc<dyn Transport>,
    api_base_url: String,
    api_key: ApiKey,
    marker: String,
}

impl OpenAiBackend {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_base_url: impl Into<String>,
        api_key: ApiKey,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_base_url: api_base_url.into(),
            api_key,
            marker: marker.into(),
        }
    }

    /// Provider-side model name: the `<marker>-` routing prefix is ours, not
    /// the provider's, so it is stripped (`openai-o4-mini` → `o4-mini`).
    fn wire_model<'a>(&self, model: &'a str) -> &'a str {
        model
            .strip_prefix(self.marker.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(model)
    }
}

impl ModelBackend for OpenAiBackend {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    fn accepts(&self, model: &str) -> bool {
        !self.marker.is_empty() && model.contains(self.marker.as_str())
    }

    fn send(
        &self,
        prompt: &str,
        system: Option<&str>,
        model: &str,
    ) -> Result<ModelResponse, DispatchError> {
        let key = self.api_key.resolve()?;

        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(Message { role: "system", content: sys });
        }
        messages.push(Message { role: "user", content: prompt });

        let payload = ChatCompletionRequest { model: self.wire_model(model), messages };
        debug!(model = %payload.model, prompt_len = prompt.len(), "sending chat completion");

        let body = serde_json::to_value(&payload)
            .map_err(|e| DispatchError::Transport(format!("failed to encode request: {e}")))?;
        let raw = self.transport.post_json(&self.api_base_url, Some(&key), &body)?;
        parse_response(&raw).map(ModelResponse::new)
    }
}

/// Extract `choices[0].message.content`.
fn parse_response(raw: &str) -> Result<String, DispatchError> {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(raw) {
        warn!(message = %env.error.message, "provider returned an error body");
        return Err(DispatchError::MalformedResponse(format!(
            "provider error: {}",
            env.error.message
        )));
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(raw)
        .map_err(|e| DispatchError::MalformedResponse(format!("invalid completion body: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| DispatchError::MalformedResponse("no content in choices[0].message".into()))
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
