//! Session orchestrator — cache-first question answering, shortcut
//! definition, history and the agent loop.
//!
//! A [`Session`] owns the [`Store`] and the [`Dispatcher`] for one process
//! invocation. Store failures other than corrupt data are logged and treated
//! as "no data" so a broken cache never costs the user an answer; model
//! failures are returned to the caller, and nothing is persisted for them.

mod agent;

use std::io::{self, Write};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::llm::{DispatchError, Dispatcher};
use crate::prompts::QuestionMode;
use crate::store::{CacheWrite, Role, Store, Transcript};

pub use agent::{AgentCommand, CLEAR_TOKEN, EXIT_TOKEN};

/// Where an answer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Cached(String),
    Fresh(String),
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Cached(t) | Answer::Fresh(t) => t,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Answer::Cached(_))
    }
}

pub struct Session {
    store: Store,
    dispatcher: Dispatcher,
    model: String,
    memory_cap: usize,
    history_limit: usize,
}

impl Session {
    pub fn new(store: Store, dispatcher: Dispatcher, config: &Config) -> Self {
        Self {
            store,
            dispatcher,
            model: config.model.clone(),
            memory_cap: config.agent.memory_cap,
            history_limit: config.history_limit,
        }
    }

    /// Override the model identifier for this invocation.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Hand the store back for an orderly close at exit.
    pub fn into_store(self) -> Store {
        self.store
    }

    // ── Direct question ──────────────────────────────────────────────────────

    /// Cached answer for `question`, if any. A failed lookup counts as a miss.
    pub fn lookup(&self, question: &str) -> Option<String> {
        match self.store.lookup_answer(question) {
            Ok(hit) => {
                debug!(hit = hit.is_some(), "cache lookup");
                hit
            }
            Err(e) => {
                warn!(error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    /// Ask the model and cache the answer. The answer is returned even when
    /// caching it fails.
    pub fn fetch(&mut self, question: &str, mode: QuestionMode) -> Result<String, DispatchError> {
        let system = mode.system_prompt();
        let response = self.dispatcher.send(question, Some(&system), &self.model)?;

        match self.store.store_answer(question, &response.text) {
            Ok(write) => debug!(?write, "answer cached"),
            Err(e) => warn!(error = %e, "failed to cache answer"),
        }
        Ok(response.text)
    }

    /// Cache first, model on a miss.
    pub fn ask(&mut self, question: &str, mode: QuestionMode) -> Result<Answer, DispatchError> {
        if let Some(answer) = self.lookup(question) {
            return Ok(Answer::Cached(answer));
        }
        self.fetch(question, mode).map(Answer::Fresh)
    }

    // ── Shortcut ─────────────────────────────────────────────────────────────

    /// Store a literal question/answer pair without asking the model.
    pub fn define_shortcut(&mut self, question: &str, answer: &str) -> Result<CacheWrite, AppError> {
        let write = self.store.store_answer(question, answer)?;
        info!(%question, ?write, "shortcut saved");
        Ok(write)
    }

    // ── History ──────────────────────────────────────────────────────────────

    /// Most recent transcripts, newest first. Corrupt rows are an error;
    /// any other store failure yields an empty history.
    pub fn history(&self) -> Result<Vec<Transcript>, AppError> {
        match self.store.recent_conversations(self.history_limit) {
            Ok(transcripts) => Ok(transcripts),
            Err(e @ AppError::Corrupt(_)) => Err(e),
            Err(e) => {
                warn!(error = %e, "history query failed");
                Ok(Vec::new())
            }
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }
}

/// Print transcripts as `User:` / `Assistant:` lines, one blank line after
/// each exchange.
pub fn render_history(out: &mut impl Write, transcripts: &[Transcript]) -> io::Result<()> {
    for transcript in transcripts {
        for turn in &transcript.turns {
            match turn.role {
                Role::User => writeln!(out, "User: {}", turn.content)?,
                Role::Assistant => writeln!(out, "Assistant: {}\n", turn.content)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use crate::llm::{DispatchError, Dispatcher, ModelBackend, ModelResponse};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub prompt: String,
        pub system: Option<String>,
        pub model: String,
    }

    /// Backend that answers from a script and records every call.
    pub struct Scripted {
        replies: Mutex<Vec<Result<String, DispatchError>>>,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl Scripted {
        /// Replies are consumed in order; once exhausted every call echoes.
        pub fn dispatcher(
            replies: Vec<Result<String, DispatchError>>,
        ) -> (Dispatcher, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let mut replies = replies;
            replies.reverse();
            let backend = Scripted { replies: Mutex::new(replies), calls: calls.clone() };
            (Dispatcher::new(Box::new(backend)), calls)
        }
    }

    impl ModelBackend for Scripted {
        fn id(&self) -> &str {
            "scripted"
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
            self.calls.lock().unwrap().push(Call {
                prompt: prompt.to_string(),
                system: system.map(str::to_string),
                model: model.to_string(),
            });
            match self.replies.lock().unwrap().pop() {
                Some(reply) => reply.map(ModelResponse::new),
                None => Ok(ModelResponse::new(format!("[echo] {prompt}"))),
            }
        }
    }
}
