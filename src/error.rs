use crate::models::status::VerifyReceiptError;

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("App Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP response code from App Store: {0}")]
    HttpStatus(u16),

    #[error("Invalid App Store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid base64 receipt payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Verification(#[from] VerifyReceiptError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ReceiptError {
    /// In-body App Store status, when the failure carries one.
    pub fn status(&self) -> Option<i32> {
        match self {
            ReceiptError::Verification(e) => Some(e.status),
            _ => None,
        }
    }

    /// Short machine-readable code for upstream layers that must not
    /// expose the message verbatim.
    pub fn code(&self) -> &'static str {
        match self {
            ReceiptError::Transport(_) | ReceiptError::HttpStatus(_) => "APP_STORE_UNAVAILABLE",
            ReceiptError::Decode(_) | ReceiptError::Base64(_) => "INVALID_APP_STORE_RESPONSE",
            ReceiptError::Verification(_) => "INVALID_RECEIPT",
            ReceiptError::Config(_) => "CONFIGURATION_ERROR",
        }
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ReceiptError>;
