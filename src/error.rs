//! Application-wide error types.

use thiserror::Error;

use crate::llm::DispatchError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("store error: {0}")]
    Store(String),

    /// Stored data that cbot itself wrote no longer decodes.
    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("config error"));
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn store_error_display() {
        let e = AppError::Store("cannot open ~/.cbot_cache".into());
        assert!(e.to_string().contains("cannot open"));
    }

    #[test]
    fn dispatch_error_is_transparent() {
        let e: AppError = DispatchError::MissingCredential("OPENAI_API_KEY".into()).into();
        assert_eq!(
            e.to_string(),
            DispatchError::MissingCredential("OPENAI_API_KEY".into()).to_string()
        );
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
