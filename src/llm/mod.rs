//! Model backend dispatch.
//!
//! A [`ModelBackend`] turns `(prompt, system, model)` into a [`ModelResponse`]
//! over one HTTP round trip. The [`Dispatcher`] is a small registry keyed by
//! backend id: the first registered backend that accepts a model identifier
//! handles it, and the fallback backend handles everything else.
//!
//! Adding a provider = new module in `providers/` + one `register` call in
//! [`providers::build`]. Routing logic never changes.

pub mod providers;
pub mod transport;

use thiserror::Error;
use tracing::debug;

// ── Error ─────────────────────────────────────────────────────────────────────

/// Why a model call produced no answer. Every variant is non-fatal: the turn
/// is lost and nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown model backend: {0}")]
    UnknownBackend(String),
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("unexpected model response: {0}")]
    MalformedResponse(String),
}

// ── Response ──────────────────────────────────────────────────────────────────

/// Normalized answer text from any backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
}

impl ModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

// ── Backend capability ────────────────────────────────────────────────────────

/// One provider protocol.
pub trait ModelBackend: Send + Sync {
    /// Registry key (e.g. `"openai"`, `"ollama"`).
    fn id(&self) -> &str;

    /// Whether this backend serves `model`.
    fn accepts(&self, model: &str) -> bool;

    /// Single synchronous request; no retry.
    fn send(
        &self,
        prompt: &str,
        system: Option<&str>,
        model: &str,
    ) -> Result<ModelResponse, DispatchError>;
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

pub struct Dispatcher {
    backends: Vec<Box<dyn ModelBackend>>,
    fallback: Box<dyn ModelBackend>,
}

impl Dispatcher {
    /// `fallback` handles every identifier no registered backend accepts.
    pub fn new(fallback: Box<dyn ModelBackend>) -> Self {
        Self { backends: Vec::new(), fallback }
    }

    /// Add a backend, replacing any existing one with the same id.
    pub fn register(&mut self, backend: Box<dyn ModelBackend>) {
        self.backends.retain(|b| b.id() != backend.id());
        self.backends.push(backend);
    }

    pub fn with(mut self, backend: Box<dyn ModelBackend>) -> Self {
        self.register(backend);
        self
    }

    /// Look a backend up by id, fallback included.
    pub fn backend(&self, id: &str) -> Result<&dyn ModelBackend, DispatchError> {
        if self.fallback.id() == id {
            return Ok(self.fallback.as_ref());
        }
        self.backends
            .iter()
            .find(|b| b.id() == id)
            .map(|b| b.as_ref())
            .ok_or_else(|| DispatchError::UnknownBackend(id.to_string()))
    }

    /// Backend that will serve `model`.
    pub fn route(&self, model: &str) -> &dyn ModelBackend {
        self.backends
            .iter()
            .find(|b| b.accepts(model))
            .map(|b| b.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    pub fn send(
        &self,
        prompt: &str,
        system: Option<&str>,
        model: &str,
    ) -> Result<ModelResponse, DispatchError> {
        let backend = self.route(model);
        debug!(backend = backend.id(), %model, has_system = system.is_some(), "dispatching");
        backend.send(prompt, system, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        id: &'static str,
        marker: &'static str,
    }

    impl ModelBackend for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn accepts(&self, model: &str) -> bool {
            !self.marker.is_empty() && model.contains(self.marker)
        }

        fn send(&self, prompt: &str, _: Option<&str>, _: &str) -> Result<ModelResponse, DispatchError> {
            Ok(ModelResponse::new(format!("[{}] {prompt}", self.id)))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Box::new(Fixed { id: "local", marker: "" }))
            .with(Box::new(Fixed { id: "hosted", marker: "openai" }))
    }

    #[test]
    fn marker_routes_to_registered_backend() {
        let d = dispatcher();
        assert_eq!(d.route("openai-o4-mini").id(), "hosted");
        assert_eq!(d.send("hi", None, "openai-o4-mini").unwrap().text, "[hosted] hi");
    }

    #[test]
    fn everything_else_falls_back() {
        let d = dispatcher();
        assert_eq!(d.route("llama3.2").id(), "local");
        assert_eq!(d.route("OpenAI-caps").id(), "local");
    }

    #[test]
    fn register_replaces_same_id() {
        let mut d = dispatcher();
        d.register(Box::new(Fixed { id: "hosted", marker: "gpt" }));
        assert_eq!(d.route("openai-o4-mini").id(), "local");
        assert_eq!(d.route("gpt-4o").id(), "hosted");
    }

    #[test]
    fn backend_lookup_by_id() {
        let d = dispatcher();
        assert!(d.backend("local").is_ok());
        assert!(d.backend("hosted").is_ok());
        assert_eq!(
            d.backend("anthropic").err(),
            Some(DispatchError::UnknownBackend("anthropic".into()))
        );
    }
}
