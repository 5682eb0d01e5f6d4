//! Model backend implementations.
//!
//! `build(config)` is called once at startup.
//! Adding a new backend = new module + one `register` call.

pub mod ollama;
pub mod openai;

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::llm::transport::{HttpTransport, Transport};
use crate::llm::{DispatchError, Dispatcher};

/// Construct the dispatcher over a real HTTP transport.
pub fn build(config: &LlmConfig) -> Result<Dispatcher, DispatchError> {
    let transport = Arc::new(HttpTransport::new(config.timeout_seconds)?);
    Ok(build_with(config, transport))
}

/// Construct the dispatcher over any transport. Tests pass a recording fake.
pub fn build_with(config: &LlmConfig, transport: Arc<dyn Transport>) -> Dispatcher {
    let local = ollama::OllamaBackend::new(transport.clone(), config.ollama.api_base_url.clone());
    let hosted = openai::OpenAiBackend::new(
        transport,
        config.openai.api_base_url.clone(),
        openai::ApiKey::Env(config.openai.api_key_env.clone()),
        config.openai.marker.clone(),
    );
    Dispatcher::new(Box::new(local)).with(Box::new(hosted))
}
