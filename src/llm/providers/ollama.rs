//! Local generation backend (Ollama `/api/generate`, non-streaming).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::transport::Transport;
use crate::llm::{DispatchError, ModelBackend, ModelResponse};

pub const BACKEND_ID: &str = "ollama";

/// Keyless loopback backend. Accepts any model identifier, so it is
/// normally installed as the dispatcher fallback.
pub struct OllamaBackend {
    transport: Arc<dyn Transport>,
    api_base_url: String,
}

impl OllamaBackend {
    pub fn new(transport: Arc<dyn Transport>, api_base_url: impl Into<String>) -> Self {
        Self { transport, api_base_url: api_base_url.into() }
    }
}

impl ModelBackend for OllamaBackend {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    fn accepts(&self, _model: &str) -> bool {
        true
    }

    fn send(
        &self,
        prompt: &str,
        system: Option<&str>,
        model: &str,
    ) -> Result<ModelResponse, DispatchError> {
        let payload = GenerateRequest { model, prompt, stream: false, system };
        debug!(%model, prompt_len = prompt.len(), "sending generate request");

        let body = serde_json::to_value(&payload)
            .map_err(|e| DispatchError::Transport(format!("failed to encode request: {e}")))?;
        let raw = self.transport.post_json(&self.api_base_url, None, &body)?;
        parse_response(&raw).map(ModelResponse::new)
    }
}

/// Extract the top-level `response` string.
fn parse_response(raw: &str) -> Result<String, DispatchError> {
    let parsed: GenerateResponse = serde_json::from_str(raw)
        .map_err(|e| DispatchError::MalformedResponse(format!("invalid generate body: {e}")))?;

    match (parsed.response, parsed.error) {
        (Some(text), _) => Ok(text),
        (None, Some(err)) => {
            warn!(error = %err, "local model returned an error body");
            Err(DispatchError::MalformedResponse(format!("provider error: {err}")))
        }
        (None, None) => Err(DispatchError::MalformedResponse("no `response` field".into())),
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::testing::Recording;

    const URL: &str = "http://localhost:11434/api/generate";

    #[test]
    fn request_shape_with_system() {
        let t = Arc::new(Recording::replying(r#"{"model":"llama3.2","response":"df -h","done":true}"#));
        let b = OllamaBackend::new(t.clone(), URL);
        let resp = b.send("disk usage", Some("be terse"), "llama3.2").unwrap();
        assert_eq!(resp.text, "df -h");

        let req = t.last().unwrap();
        assert_eq!(req.url, URL);
        assert_eq!(req.bearer, None);
        assert_eq!(
            req.body,
            serde_json::json!({
                "model": "llama3.2",
                "prompt": "disk usage",
                "stream": false,
                "system": "be terse",
            })
        );
    }

    #[test]
    fn system_omitted_when_absent() {
        let t = Arc::new(Recording::replying(r#"{"response":"ok"}"#));
        OllamaBackend::new(t.clone(), URL).send("q", None, "deepseek-r1").unwrap();
        let body = t.last().unwrap().body;
        assert!(body.get("system").is_none());
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn malformed_bodies() {
        for body in [r#"{"done":true}"#, r#"{"response":7}"#, "", "<html>502</html>"] {
            let t = Arc::new(Recording::replying(body));
            let err = OllamaBackend::new(t, URL).send("q", None, "llama3.2").unwrap_err();
            assert!(matches!(err, DispatchError::MalformedResponse(_)), "{body}: {err:?}");
        }
    }

    #[test]
    fn error_field_is_carried() {
        let t = Arc::new(Recording::replying(r#"{"error":"model \"nope\" not found"}"#));
        let err = OllamaBackend::new(t, URL).send("q", None, "nope").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn transport_failure_passes_through() {
        let t = Arc::new(Recording::failing("connection refused"));
        let err = OllamaBackend::new(t, URL).send("q", None, "llama3.2").unwrap_err();
        assert_eq!(err, DispatchError::Transport("connection refused".into()));
    }
}
