use serde::Deserialize;

pub const PRODUCTION_VERIFY_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";
pub const SANDBOX_VERIFY_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub iap: IAPConfig,
}

/// Everything a single verification call needs. Cloned into each
/// `ReceiptService`; never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct IAPConfig {
    /// App-specific shared secret, sent as `password`
    pub shared_secret: String,
    /// Talk to the sandbox endpoint only
    #[serde(default)]
    pub sandbox: bool,
    /// Extra attempts allowed when Apple answers with `is_retryable`
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_exclude_old_transactions")]
    pub exclude_old_transactions: bool,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_production_url")]
    pub production_url: String,
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,
}

fn default_exclude_old_transactions() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_production_url() -> String {
    PRODUCTION_VERIFY_URL.to_string()
}

fn default_sandbox_url() -> String {
    SANDBOX_VERIFY_URL.to_string()
}

impl IAPConfig {
    /// Production-first configuration with Apple's default endpoints.
    pub fn new(shared_secret: impl Into<String>) -> Self {
        Self {
            shared_secret: shared_secret.into(),
            sandbox: false,
            max_retries: 0,
            exclude_old_transactions: default_exclude_old_transactions(),
            request_timeout_ms: default_request_timeout_ms(),
            retry_backoff_ms: 0,
            production_url: default_production_url(),
            sandbox_url: default_sandbox_url(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            // Allow environment variables to override config file
            .add_source(
                config::Environment::with_prefix("RECEIPTKIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
