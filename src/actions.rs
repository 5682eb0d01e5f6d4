//! Post-answer actions: clipboard copy and command execution.
//!
//! Nothing here touches the store or the model backends.

use std::io::Write;
use std::process::{Command, ExitStatus};

use tracing::{debug, warn};

use crate::error::AppError;

/// Outcome of [`execute`].
#[derive(Debug)]
pub enum Execution {
    /// The command contained `sudo` and was not run.
    Refused(String),
    Ran { command: String, status: ExitStatus },
}

/// Pull the runnable command out of a model answer: the body of the first
/// fenced code block, else the first inline backtick span, else the whole
/// answer.
pub fn extract_command(answer: &str) -> &str {
    if let Some(block) = fenced_block(answer) {
        return block;
    }
    if let Some(span) = inline_span(answer) {
        return span;
    }
    answer.trim()
}

fn fenced_block(answer: &str) -> Option<&str> {
    let start = answer.find("```")? + 3;
    let rest = &answer[start..];
    // The rest of the opening fence line is an optional language tag.
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    let end = body.find("```")?;
    let body = body[..end].trim();
    (!body.is_empty()).then_some(body)
}

fn inline_span(answer: &str) -> Option<&str> {
    let start = answer.find('`')? + 1;
    let len = answer[start..].find('`')?;
    let span = answer[start..start + len].trim();
    (!span.is_empty()).then_some(span)
}

/// Run the command extracted from `answer` through the platform shell,
/// announcing it on `out` first. Commands containing `sudo` are refused.
pub fn execute(answer: &str, out: &mut impl Write) -> Result<Execution, AppError> {
    let command = extract_command(answer).to_string();
    if command.contains("sudo") {
        warn!(%command, "refusing to execute sudo command");
        writeln!(out, "Execution canceled, cbot will not execute sudo commands.")?;
        return Ok(Execution::Refused(command));
    }

    writeln!(out, "cbot executing: {command}")?;
    out.flush()?;
    debug!(%command, "executing");
    let status = shell(&command).status()?;
    Ok(Execution::Ran { command, status })
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

/// Copy `text` to the system clipboard.
#[cfg(feature = "clipboard")]
pub fn copy_to_clipboard(text: &str) -> Result<(), AppError> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| AppError::Clipboard(format!("clipboard unavailable: {e}")))?;
    clipboard
        .set_text(text)
        .map_err(|e| AppError::Clipboard(format!("cannot set clipboard text: {e}")))?;
    debug!(len = text.len(), "copied answer to clipboard");
    Ok(())
}

#[cfg(not(feature = "clipboard"))]
pub fn copy_to_clipboard(_text: &str) -> Result<(), AppError> {
    Err(AppError::Clipboard("cbot was built without the `clipboard` feature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_wins() {
        let answer = "Use `ls` or:\n```bash\nls -la ~\n```\nThat lists everything.";
        assert_eq!(extract_command(answer), "ls -la ~");
    }

    #[test]
    fn fenced_block_without_language() {
        assert_eq!(extract_command("```\ndate\n```"), "date");
    }

    #[test]
    fn inline_span_when_no_fence() {
        assert_eq!(
            extract_command("You can run `cp file.txt ~/` to copy it."),
            "cp file.txt ~/"
        );
    }

    #[test]
    fn unclosed_backtick_falls_back_to_whole_answer() {
        assert_eq!(extract_command("  run `date  "), "run `date");
    }

    #[test]
    fn plain_answer_is_trimmed() {
        assert_eq!(extract_command("  pmset sleepnow\n"), "pmset sleepnow");
    }

    #[test]
    fn sudo_is_refused() {
        let mut out = Vec::new();
        match execute("`sudo rm -rf /tmp/x`", &mut out).unwrap() {
            Execution::Refused(cmd) => assert_eq!(cmd, "sudo rm -rf /tmp/x"),
            other => panic!("expected refusal, got {other:?}"),
        }
        assert!(String::from_utf8(out).unwrap().starts_with("Execution canceled"));
    }

    #[cfg(unix)]
    #[test]
    fn runs_through_shell() {
        let mut out = Vec::new();
        match execute("`exit 3`", &mut out).unwrap() {
            Execution::Ran { command, status } => {
                assert_eq!(command, "exit 3");
                assert_eq!(status.code(), Some(3));
                assert_eq!(String::from_utf8(out).unwrap(), "cbot executing: exit 3\n");
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[cfg(not(feature = "clipboard"))]
    #[test]
    fn clipboard_needs_feature() {
        match copy_to_clipboard("ls") {
            Err(AppError::Clipboard(msg)) => assert!(msg.contains("clipboard")),
            other => panic!("expected clipboard error, got {other:?}"),
        }
    }

    #[cfg(feature = "clipboard")]
    #[test]
    fn clipboard_failure_is_typed() {
        // Headless hosts have no clipboard; whatever happens must not be an io error.
        match copy_to_clipboard("ls") {
            Ok(()) | Err(AppError::Clipboard(_)) => {}
            Err(e) => panic!("unexpected error kind: {e}"),
        }
    }
}
