//! Application error type.
//!
//! Every fallible operation returns `Result<_, AppError>`. The error carries the
//! process exit code so `main` can report failures without inspecting messages:
//!
//! - `2`: bad input, usage, or I/O
//! - `3`: not enough data to compute the requested result
//! - `4`: numerical or internal failure

#[derive(Clone, PartialEq, Eq)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Invalid input file, settings, or arguments.
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Too few particles/points/lag times for the requested computation.
    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Solver breakdown, non-finite values, or other internal failures.
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with additional context, keeping the exit code.
    pub fn context(self, prefix: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{prefix}: {}", self.message),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_exit_code() {
        let err = AppError::insufficient("only one point").context("particle 7");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "particle 7: only one point");
    }
}
