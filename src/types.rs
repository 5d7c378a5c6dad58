// Error taxonomy shared across the crate

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A search term was empty; raised before any network call is made.
    #[error("Invalid search term: {0}")]
    InvalidTerm(String),

    #[error("{provider} request for '{term}' ({year}) failed: {message}")]
    Transport {
        provider: String,
        term: String,
        year: i32,
        message: String,
    },

    #[error("Could not parse {provider} response for '{term}' ({year}): {message}")]
    Parse {
        provider: String,
        term: String,
        year: i32,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed results file: {0}")]
    Format(String),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AppError {
    pub fn transport(provider: &str, term: &str, year: i32, message: impl Into<String>) -> Self {
        AppError::Transport {
            provider: provider.to_string(),
            term: term.to_string(),
            year,
            message: message.into(),
        }
    }

    pub fn parse(provider: &str, term: &str, year: i32, message: impl Into<String>) -> Self {
        AppError::Parse {
            provider: provider.to_string(),
            term: term.to_string(),
            year,
            message: message.into(),
        }
    }

    /// Year the failure happened in, for provider failures.
    pub fn year(&self) -> Option<i32> {
        match self {
            AppError::Transport { year, .. } | AppError::Parse { year, .. } => Some(*year),
            _ => None,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
