//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code for log grepping and
//! monitoring. Risk source failures never cross the aggregation boundary
//! as errors (they degrade into failed signals); everything else flows
//! through these types.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - ADDR_xxx: address validation errors
//! - SRC_xxx: risk source errors
//! - BLK_xxx: blocklist store errors
//! - SES_xxx: edit session errors
//! - CFG_xxx: configuration errors
//! - API_xxx: API errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Address Errors (1xx)
    // ============================================
    /// Address failed prefix/length/hex validation
    AddressInvalidFormat,

    // ============================================
    // Risk Source Errors (2xx)
    // ============================================
    /// Source exceeded its fetch timeout
    SourceTimeout,
    /// Transport-level HTTP failure
    SourceHttp,
    /// Source rate limited (HTTP 429 or provider-side)
    SourceRateLimited,
    /// Provider answered but reported failure
    SourceProviderError,
    /// Provider payload did not match the expected shape
    SourceInvalidPayload,

    // ============================================
    // Blocklist Store Errors (3xx)
    // ============================================
    /// Entry already present for this address
    BlocklistAlreadyPresent,
    /// No entry for this address
    BlocklistNotFound,
    /// Reading or writing the store file failed
    StoreIo,
    /// Store (de)serialization failed
    StoreSerialize,

    // ============================================
    // Edit Session Errors (4xx)
    // ============================================
    /// Supplied secret did not match
    SessionSecretMismatch,
    /// No active session for the given handle
    SessionNotFound,
    /// Session idled past its lifetime
    SessionExpired,

    // ============================================
    // Configuration Errors (5xx)
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Unsupported network name
    ConfigUnsupportedNetwork,

    // ============================================
    // API Errors (6xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,
    /// Resource not found
    ApiNotFound,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Address Errors
            Self::AddressInvalidFormat => "ADDR_INVALID_FORMAT",

            // Risk Source Errors
            Self::SourceTimeout => "SRC_TIMEOUT",
            Self::SourceHttp => "SRC_HTTP_ERROR",
            Self::SourceRateLimited => "SRC_RATE_LIMITED",
            Self::SourceProviderError => "SRC_PROVIDER_ERROR",
            Self::SourceInvalidPayload => "SRC_INVALID_PAYLOAD",

            // Blocklist Store Errors
            Self::BlocklistAlreadyPresent => "BLK_ALREADY_PRESENT",
            Self::BlocklistNotFound => "BLK_NOT_FOUND",
            Self::StoreIo => "BLK_STORE_IO",
            Self::StoreSerialize => "BLK_STORE_SERIALIZE",

            // Edit Session Errors
            Self::SessionSecretMismatch => "SES_SECRET_MISMATCH",
            Self::SessionNotFound => "SES_NOT_FOUND",
            Self::SessionExpired => "SES_EXPIRED",

            // Configuration Errors
            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigUnsupportedNetwork => "CFG_UNSUPPORTED_NETWORK",

            // API Errors
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",
            Self::ApiNotFound => "API_NOT_FOUND",

            // Generic
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::AddressInvalidFormat | Self::ConfigInvalidValue => 400,
            Self::SessionSecretMismatch => 403,
            Self::ApiNotFound | Self::BlocklistNotFound | Self::SessionNotFound => 404,
            Self::BlocklistAlreadyPresent => 409,
            Self::SessionExpired => 410,
            Self::ApiRateLimited | Self::SourceRateLimited => 429,
            Self::SourceHttp | Self::SourceProviderError | Self::SourceInvalidPayload => 502,
            Self::SourceTimeout => 504,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceTimeout
                | Self::SourceHttp
                | Self::SourceRateLimited
                | Self::SourceProviderError
                | Self::StoreIo
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Address failed validation
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AddressInvalidFormat, msg)
    }

    /// Source fetch timed out
    pub fn source_timeout(source_name: &str, secs: u64) -> Self {
        Self::new(
            ErrorCode::SourceTimeout,
            format!("source {} timed out after {}s", source_name, secs),
        )
    }

    /// Source rate limited
    pub fn source_rate_limited() -> Self {
        Self::new(ErrorCode::SourceRateLimited, "Rate limited (HTTP 429)")
    }

    /// Entry already present in the blocklist
    pub fn already_present(address: &str) -> Self {
        Self::new(
            ErrorCode::BlocklistAlreadyPresent,
            format!("{} is already blocklisted", address),
        )
    }

    /// No blocklist entry for address
    pub fn blocklist_not_found(address: &str) -> Self {
        Self::new(
            ErrorCode::BlocklistNotFound,
            format!("{} is not blocklisted", address),
        )
    }

    /// Store file I/O failed
    pub fn store_io(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreIo, msg)
    }

    /// Secret did not match
    pub fn secret_mismatch() -> Self {
        Self::new(ErrorCode::SessionSecretMismatch, "Edit secret did not match")
    }

    /// No session for handle
    pub fn session_not_found() -> Self {
        Self::new(ErrorCode::SessionNotFound, "No active session for handle")
    }

    /// Session idled out
    pub fn session_expired() -> Self {
        Self::new(ErrorCode::SessionExpired, "Session expired after idling")
    }

    /// Missing environment variable
    pub fn missing_env(var_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Missing environment variable: {}", var_name),
        )
    }

    /// Unsupported network
    pub fn unsupported_network(name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigUnsupportedNetwork,
            format!("Unsupported network: {}", name),
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::StoreIo, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::SourceTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::SourceHttp, "Connection failed")
        } else {
            Self::new(ErrorCode::SourceHttp, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::StoreSerialize, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::invalid_address("missing 0x prefix");
        assert_eq!(err.code, ErrorCode::AddressInvalidFormat);
        assert_eq!(err.code_str(), "ADDR_INVALID_FORMAT");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::SourceTimeout.is_retryable());
        assert!(ErrorCode::SourceRateLimited.is_retryable());
        assert!(!ErrorCode::AddressInvalidFormat.is_retryable());
        assert!(!ErrorCode::SessionSecretMismatch.is_retryable());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::ApiBadRequest.http_status(), 400);
        assert_eq!(ErrorCode::BlocklistAlreadyPresent.http_status(), 409);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::StoreSerialize.http_status(), 500);
    }

    #[test]
    fn test_display_format() {
        let err = AppError::secret_mismatch();
        assert_eq!(
            err.to_string(),
            "[SES_SECRET_MISMATCH] Edit secret did not match"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AppError = io.into();
        assert_eq!(err.code, ErrorCode::StoreIo);
    }
}
