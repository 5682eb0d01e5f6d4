//! System prompts for the direct-question modes.

/// Prompt for `-g`: plain question answering.
pub const GENERAL: &str =
    "You are a helpful assistant. Answer the user's question in the best and most concise way possible.";

/// Which system prompt a direct question is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionMode {
    /// Translate the question into a shell command for this platform.
    #[default]
    Command,
    General,
}

impl QuestionMode {
    pub fn system_prompt(self) -> String {
        match self {
            QuestionMode::Command => command_prompt(platform_name()),
            QuestionMode::General => GENERAL.to_string(),
        }
    }
}

pub fn command_prompt(platform: &str) -> String {
    format!(
        "You are a command line translation tool for {platform}. \
         You will provide a concise answer to the user's question with the correct command."
    )
}

/// Human name of the build target's OS, as used in the command prompt.
pub fn platform_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "Mac"
    } else if cfg!(target_os = "windows") {
        "Windows"
    } else {
        "Linux"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_prompt_names_platform() {
        let p = QuestionMode::Command.system_prompt();
        assert!(p.contains(platform_name()));
        assert!(p.starts_with("You are a command line translation tool for"));
    }

    #[test]
    fn general_prompt_is_fixed() {
        assert_eq!(QuestionMode::General.system_prompt(), GENERAL);
    }
}
