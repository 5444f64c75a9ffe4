use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentinelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SentinelError {
    #[error("content container not found: {selector}")]
    ContainerNotFound { selector: String },

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid root margin {input:?}: {reason}")]
    InvalidMargin { input: String, reason: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("host observer error: {message}")]
    Host { message: String },
}

impl SentinelError {
    #[must_use]
    pub fn container_not_found(selector: impl Into<String>) -> Self {
        Self::ContainerNotFound {
            selector: selector.into(),
        }
    }

    #[must_use]
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_margin(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMargin {
            input: input.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_input() {
        let err = SentinelError::container_not_found(".grid");
        assert_eq!(err.to_string(), "content container not found: .grid");

        let err = SentinelError::invalid_selector("..", "empty class name");
        assert_eq!(err.to_string(), "invalid selector \"..\": empty class name");
    }
}
