/*!
 * Error types for the llm-translate library.
 *
 * Errors are grouped by kind rather than by where they are raised:
 * configuration, glossary, provider, quality, file and format errors.
 * Every `TranslationError` maps to a stable `ErrorCode` string and a
 * process exit code used by the CLI.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The requested provider is not registered or not configured
    #[error("Provider not found: {0}")]
    NotFound(String),
}

impl ProviderError {
    /// Classify an HTTP failure the way every client does
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            429 => Self::RateLimitExceeded(message),
            401 | 403 => Self::AuthenticationError(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigNotFound,
    ConfigInvalid,
    GlossaryNotFound,
    GlossaryInvalid,
    ProviderNotFound,
    ProviderAuthFailed,
    ProviderRateLimited,
    ProviderError,
    QualityThresholdNotMet,
    GlossaryComplianceFailed,
    FileNotFound,
    FileReadError,
    FileWriteError,
    UnsupportedFormat,
    ChunkTooLarge,
    Unknown,
}

impl ErrorCode {
    /// Code as printed in JSON output and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigNotFound => "CONFIG_NOT_FOUND",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::GlossaryNotFound => "GLOSSARY_NOT_FOUND",
            Self::GlossaryInvalid => "GLOSSARY_INVALID",
            Self::ProviderNotFound => "PROVIDER_NOT_FOUND",
            Self::ProviderAuthFailed => "PROVIDER_AUTH_FAILED",
            Self::ProviderRateLimited => "PROVIDER_RATE_LIMITED",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::QualityThresholdNotMet => "QUALITY_THRESHOLD_NOT_MET",
            Self::GlossaryComplianceFailed => "GLOSSARY_COMPLIANCE_FAILED",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::FileReadError => "FILE_READ_ERROR",
            Self::FileWriteError => "FILE_WRITE_ERROR",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::ChunkTooLarge => "CHUNK_TOO_LARGE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Process exit code for this kind of failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound | Self::ConfigNotFound | Self::GlossaryNotFound => 3,
            Self::ConfigInvalid | Self::UnsupportedFormat => 2,
            Self::QualityThresholdNotMet => 4,
            Self::ProviderNotFound
            | Self::ProviderAuthFailed
            | Self::ProviderRateLimited
            | Self::ProviderError => 5,
            Self::GlossaryInvalid => 6,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Configuration file not found: {path} ({message})")]
    ConfigNotFound { path: String, message: String },

    #[error("Invalid configuration in {path}: {}", .errors.join("; "))]
    ConfigInvalid { path: String, errors: Vec<String> },

    #[error("Glossary file not found: {path} ({message})")]
    GlossaryNotFound { path: String, message: String },

    #[error("Invalid glossary {path}: {message}")]
    GlossaryInvalid { path: String, message: String },

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Raised only in strict quality mode
    #[error(
        "Quality threshold not met: score {score:.1} < {threshold} after {iterations}/{max_iterations} iterations"
    )]
    QualityThresholdNotMet {
        score: f64,
        threshold: f64,
        iterations: u32,
        max_iterations: u32,
        issues: Vec<String>,
    },

    /// Raised only in strict glossary mode
    #[error("Glossary compliance failed: {} of {total} terms missed ({})", .missed.len(), .missed.join(", "))]
    GlossaryComplianceFailed {
        missed: Vec<String>,
        applied: Vec<String>,
        total: usize,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    FileWrite { path: String, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Chunk too large: {tokens} tokens exceeds limit of {max_tokens}")]
    ChunkTooLarge { tokens: usize, max_tokens: usize },

    #[error("{0}")]
    Unknown(String),
}

impl TranslationError {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Self::ConfigInvalid { .. } => ErrorCode::ConfigInvalid,
            Self::GlossaryNotFound { .. } => ErrorCode::GlossaryNotFound,
            Self::GlossaryInvalid { .. } => ErrorCode::GlossaryInvalid,
            Self::Provider(err) => match err {
                ProviderError::NotFound(_) => ErrorCode::ProviderNotFound,
                ProviderError::AuthenticationError(_) => ErrorCode::ProviderAuthFailed,
                ProviderError::RateLimitExceeded(_) => ErrorCode::ProviderRateLimited,
                _ => ErrorCode::ProviderError,
            },
            Self::QualityThresholdNotMet { .. } => ErrorCode::QualityThresholdNotMet,
            Self::GlossaryComplianceFailed { .. } => ErrorCode::GlossaryComplianceFailed,
            Self::FileNotFound(_) => ErrorCode::FileNotFound,
            Self::FileRead { .. } => ErrorCode::FileReadError,
            Self::FileWrite { .. } => ErrorCode::FileWriteError,
            Self::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Self::ChunkTooLarge { .. } => ErrorCode::ChunkTooLarge,
            Self::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

/// Result alias used throughout the library
pub type Result<T, E = TranslationError> = std::result::Result<T, E>;
