//! Agent mode — a line-oriented chat loop whose accumulated memory is
//! replayed as the system message on every turn.
//!
//! Memory lives in the store, so it survives across invocations until the
//! user types `clear`. After each successful turn the store keeps only the
//! newest `memory_cap` items (`0` = unbounded), evicting oldest first and
//! always a whole user/agent exchange at a time.

use std::io::{self, BufRead, Write};

use tracing::{debug, info, warn};

use super::Session;
use crate::llm::DispatchError;

/// Ends the agent loop.
pub const EXIT_TOKEN: &str = "exit";
/// Clears agent memory without ending the loop.
pub const CLEAR_TOKEN: &str = "clear";

/// One line of agent input, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand<'a> {
    Exit,
    Clear,
    Blank,
    Prompt(&'a str),
}

impl<'a> AgentCommand<'a> {
    /// Classify a raw input line (trailing newline allowed). The prompt keeps
    /// its inner whitespace; only the line terminator is removed.
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim_end_matches(['\n', '\r']);
        match line {
            EXIT_TOKEN => AgentCommand::Exit,
            CLEAR_TOKEN => AgentCommand::Clear,
            l if l.trim().is_empty() => AgentCommand::Blank,
            l => AgentCommand::Prompt(l),
        }
    }
}

/// Largest even item count within `cap`, and never less than one exchange,
/// so trimming can't leave a reply without its question.
fn whole_exchanges(cap: usize) -> usize {
    (cap - cap % 2).max(2)
}

impl Session {
    /// Newline-joined memory, oldest first; `None` when memory is empty or
    /// unreadable.
    pub fn agent_context(&self) -> Option<String> {
        match self.store.load_memory() {
            Ok(items) if items.is_empty() => None,
            Ok(items) => Some(items.join("\n")),
            Err(e) => {
                warn!(error = %e, "cannot load agent memory; continuing without context");
                None
            }
        }
    }

    /// One agent turn: send `prompt` with the accumulated memory as context
    /// and, on success, remember the exchange.
    pub fn agent_turn(&mut self, prompt: &str) -> Result<String, DispatchError> {
        let context = self.agent_context();
        debug!(context_len = context.as_ref().map_or(0, String::len), "agent turn");

        let response = self.dispatcher.send(prompt, context.as_deref(), &self.model)?;

        if let Err(e) = self.store.append_exchange(prompt, &response.text) {
            warn!(error = %e, "failed to save agent memory");
        } else if self.memory_cap > 0 {
            let keep = whole_exchanges(self.memory_cap);
            match self.store.trim_memory(keep) {
                Ok(0) => {}
                Ok(evicted) => debug!(evicted, keep, "agent memory trimmed"),
                Err(e) => warn!(error = %e, "failed to trim agent memory"),
            }
        }
        Ok(response.text)
    }

    /// Drop all agent memory. Failures are logged.
    pub fn clear_agent_memory(&self) {
        match self.store.clear_memory() {
            Ok(n) => info!(removed = n, "agent memory cleared"),
            Err(e) => warn!(error = %e, "failed to clear agent memory"),
        }
    }

    /// Run the agent loop over `input` until `exit` or end of input.
    ///
    /// Input bytes that are not valid UTF-8 are replaced, not rejected.
    pub fn run_agent(&mut self, mut input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Entering agent mode. Type '{EXIT_TOKEN}' to end the agent chat.")?;
        writeln!(out, "Type '{CLEAR_TOKEN}' to clear conversation history.")?;
        out.flush()?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            match AgentCommand::parse(&line) {
                AgentCommand::Exit => break,
                AgentCommand::Blank => continue,
                AgentCommand::Clear => {
                    self.clear_agent_memory();
                    writeln!(out, "Conversation history cleared.")?;
                }
                AgentCommand::Prompt(prompt) => match self.agent_turn(prompt) {
                    Ok(reply) => writeln!(out, "Agent: {reply}")?,
                    Err(e) => writeln!(out, "Failed to get answer from API: {e}")?,
                },
            }
            out.flush()?;
        }
        Ok(())
    }
}
