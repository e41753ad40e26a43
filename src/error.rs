use thiserror::Error;

#[derive(Clone)]
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

    pub fn exit_code(&self) -> u8 {
        self.exit_code
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

/// Failure of a single nonlinear fit.
///
/// Both variants are per-subject: a batch logs them and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Malformed or insufficient data; the subject must be skipped or flagged.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The optimizer exhausted its iteration budget or left the finite domain.
    #[error("fit did not converge within {iterations} iterations")]
    FitDivergence { iterations: usize },
}

impl FitError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FitError::InvalidInput(message.into())
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::InvalidInput(_) => 3,
            FitError::FitDivergence { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
