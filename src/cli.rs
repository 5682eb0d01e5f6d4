//! Command-line surface. Flags mirror the classic cbot ones.

use clap::Parser;

use cbot::prompts::QuestionMode;

const EXAMPLES: &str = "\
Examples:
  cbot how do I copy files to my home directory
  cbot \"How do I put my computer to sleep\"
  cbot -c \"how do I install homebrew?\"      (copies the result to clipboard)
  cbot -x what is the date                  (executes the result)
  cbot -g who was the 22nd president        (runs in general question mode)
  cbot -s deploy \"make deploy\"              (saves a shortcut)
  cbot -m                                   (prints the conversation history)
  cbot -a                                   (runs in agent mode)";

#[derive(Debug, Parser)]
#[command(
    name = "cbot",
    version,
    about = "Turn questions into shell commands with a local or hosted model",
    after_help = EXAMPLES
)]
pub struct Cli {
    /// Use Llama (`32` = llama3.2)
    #[arg(short = 'l', value_name = "VERSION", value_parser = ["32"])]
    pub llama: Option<String>,

    /// Use deepseek-r1
    #[arg(short = 'd')]
    pub deepseek: bool,

    /// Use an OpenAI model (`a` = o4-mini)
    #[arg(short = 'o', value_name = "VARIANT", value_parser = ["a"])]
    pub openai: Option<String>,

    /// Any model identifier; identifiers containing "openai" go to the hosted API
    #[arg(long, value_name = "ID")]
    pub model: Option<String>,

    /// Agent mode: chat with memory until `exit`
    #[arg(short = 'a')]
    pub agent: bool,

    /// Execute the command in the answer
    #[arg(short = 'x')]
    pub execute: bool,

    /// Copy the answer to the clipboard
    #[arg(short = 'c')]
    pub clip: bool,

    /// General question mode
    #[arg(short = 'g')]
    pub general: bool,

    /// Save NAME -> COMMAND in the cache without asking the model
    #[arg(short = 's', num_args = 2, value_names = ["NAME", "COMMAND"])]
    pub shortcut: Option<Vec<String>>,

    /// Print the conversation history
    #[arg(short = 'm')]
    pub history: bool,

    /// The question
    #[arg(trailing_var_arg = true)]
    pub question: Vec<String>,
}

/// What this invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Agent,
    Shortcut { question: String, answer: String },
    History,
    Ask(String),
    Idle,
}

impl Cli {
    /// Model selected by flags, if any. `--model` beats the shorthand flags.
    pub fn model(&self) -> Option<String> {
        if let Some(model) = &self.model {
            return Some(model.clone());
        }
        if self.openai.is_some() {
            return Some("openai-o4-mini".to_string());
        }
        if self.deepseek {
            return Some("deepseek-r1".to_string());
        }
        self.llama.as_ref().map(|_| "llama3.2".to_string())
    }

    pub fn question_mode(&self) -> QuestionMode {
        if self.general { QuestionMode::General } else { QuestionMode::Command }
    }

    pub fn mode(&self) -> Mode {
        if self.agent {
            return Mode::Agent;
        }
        if let Some([question, answer]) = self.shortcut.as_deref() {
            return Mode::Shortcut { question: question.clone(), answer: answer.clone() };
        }
        if self.history {
            return Mode::History;
        }
        let question = self.question.join(" ");
        if question.trim().is_empty() { Mode::Idle } else { Mode::Ask(question) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cbot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn question_words_are_joined() {
        let cli = parse(&["how", "do", "I", "list", "files"]);
        assert_eq!(cli.mode(), Mode::Ask("how do I list files".into()));
        assert_eq!(cli.model(), None);
        assert_eq!(cli.question_mode(), QuestionMode::Command);
    }

    #[test]
    fn flags_before_question() {
        let cli = parse(&["-c", "-x", "-g", "what is the date"]);
        assert!(cli.clip && cli.execute);
        assert_eq!(cli.question_mode(), QuestionMode::General);
        assert_eq!(cli.mode(), Mode::Ask("what is the date".into()));
    }

    #[test]
    fn model_shorthands() {
        assert_eq!(parse(&["-l", "32", "q"]).model().as_deref(), Some("llama3.2"));
        assert_eq!(parse(&["-d", "q"]).model().as_deref(), Some("deepseek-r1"));
        assert_eq!(parse(&["-o", "a", "q"]).model().as_deref(), Some("openai-o4-mini"));
        assert_eq!(
            parse(&["-d", "--model", "qwen2.5", "q"]).model().as_deref(),
            Some("qwen2.5")
        );
    }

    #[test]
    fn unknown_shorthand_values_rejected() {
        assert!(Cli::try_parse_from(["cbot", "-o", "b", "q"]).is_err());
        assert!(Cli::try_parse_from(["cbot", "-l", "31", "q"]).is_err());
    }

    #[test]
    fn shortcut_takes_two_values() {
        let cli = parse(&["-s", "deploy", "make deploy"]);
        assert_eq!(
            cli.mode(),
            Mode::Shortcut { question: "deploy".into(), answer: "make deploy".into() }
        );
        assert!(Cli::try_parse_from(["cbot", "-s", "only-name"]).is_err());
    }

    #[test]
    fn mode_precedence() {
        assert_eq!(parse(&["-a", "-m"]).mode(), Mode::Agent);
        assert_eq!(parse(&["-m", "q"]).mode(), Mode::History);
        assert_eq!(parse(&[]).mode(), Mode::Idle);
    }
}
