pub const STATUS_OK: i32 = 0;
/// iOS 6 style receipt: valid, but the subscription has expired.
pub const STATUS_SUBSCRIPTION_EXPIRED: i32 = 21006;
/// Sandbox receipt sent to production.
pub const STATUS_SANDBOX_RECEIPT: i32 = 21007;
/// Production receipt sent to sandbox.
pub const STATUS_PRODUCTION_RECEIPT: i32 = 21008;

/// Apple reserves this range for transient server-side failures.
pub const RETRYABLE_STATUS_RANGE: std::ops::RangeInclusive<i32> = 21100..=21199;

pub const DEFAULT_STATUS_CAUSE: &str = "Internal data access error";
pub const UNKNOWN_STATUS_CAUSE: &str = "unknown response status";

const STATUS_CAUSES: &[(i32, &str)] = &[
    (21000, "The App Store could not read the JSON object you provided."),
    (21002, "The data in the receipt-data property was malformed or missing."),
    (21003, "The receipt could not be authenticated."),
    (
        21004,
        "The shared secret you provided does not match the shared secret on file for your account.",
    ),
    (21005, "The receipt server is not currently available."),
    (21006, "This receipt is valid but the subscription has expired."),
    (
        21007,
        "This receipt is from the test environment, but it was sent to the production environment for verification. Send it to the test environment instead.",
    ),
    (
        21008,
        "This receipt is from the production environment, but it was sent to the test environment for verification. Send it to the production environment instead.",
    ),
    (
        21010,
        "This receipt could not be authorized. Treat this the same as if a purchase was never made.",
    ),
];

/// Non-zero `status` returned in the body of a verifyReceipt response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{cause} (status {status})")]
pub struct VerifyReceiptError {
    pub status: i32,
    pub cause: &'static str,
}

impl VerifyReceiptError {
    pub fn from_status(status: i32) -> Self {
        Self {
            status,
            cause: status_cause(status),
        }
    }

    pub fn is_retryable(&self) -> bool {
        is_retryable_status(self.status)
    }
}

/// Human-readable cause for a non-zero status.
pub fn status_cause(status: i32) -> &'static str {
    STATUS_CAUSES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, cause)| *cause)
        .unwrap_or_else(|| {
            if is_retryable_status(status) {
                DEFAULT_STATUS_CAUSE
            } else {
                UNKNOWN_STATUS_CAUSE
            }
        })
}

pub fn is_retryable_status(status: i32) -> bool {
    RETRYABLE_STATUS_RANGE.contains(&status)
}

/// `None` on success, the typed error otherwise.
pub fn check_status(status: i32) -> Option<VerifyReceiptError> {
    (status != STATUS_OK).then(|| VerifyReceiptError::from_status(status))
}
