use std::time::Duration;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    config::IAPConfig,
    error::Result,
    models::{
        status::STATUS_SANDBOX_RECEIPT,
        subscription::extract_auto_renewables,
        AutoRenewable, Environment, ReceiptRequest, ReceiptResponse, StateMask,
    },
    services::transport,
};

/// Turns receipts into classified subscription records.
///
/// Holds no mutable state: every call works from the immutable
/// configuration it was built with, so clones can be shared freely
/// between tasks.
#[derive(Debug, Clone)]
pub struct ReceiptService {
    config: IAPConfig,
    http_client: reqwest::Client,
}

impl ReceiptService {
    pub fn new(config: &IAPConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self::with_client(config, http_client))
    }

    pub fn with_client(config: &IAPConfig, http_client: reqwest::Client) -> Self {
        Self {
            config: config.clone(),
            http_client,
        }
    }

    pub fn config(&self) -> &IAPConfig {
        &self.config
    }

    /// Request for `receipt` using the configured secret.
    pub fn request_for(&self, receipt: impl AsRef<[u8]>) -> ReceiptRequest {
        ReceiptRequest::new(
            receipt,
            self.config.shared_secret.clone(),
            self.config.exclude_old_transactions,
        )
    }

    /// Verifies against the configured environment.
    ///
    /// In production mode a receipt rejected with 21007 (sandbox receipt)
    /// is sent once more to the sandbox, and that answer wins. This is the
    /// flow Apple recommends so App Review receipts keep working.
    #[instrument(skip(self, request), fields(sandbox = self.config.sandbox))]
    pub async fn verify_receipt(&self, request: &ReceiptRequest) -> Result<ReceiptResponse> {
        if self.config.sandbox {
            return self.verify_at(request, Environment::Sandbox).await;
        }

        let response = self.verify_at(request, Environment::Production).await?;
        if response.status == STATUS_SANDBOX_RECEIPT {
            warn!("Sandbox receipt sent to production, retrying against sandbox");
            return self.verify_at(request, Environment::Sandbox).await;
        }

        Ok(response)
    }

    /// Every auto-renewable record of the receipt, classified.
    pub async fn get_auto_renewables(
        &self,
        receipt: impl AsRef<[u8]>,
    ) -> Result<Vec<AutoRenewable>> {
        self.get_entitlements(receipt, StateMask::EMPTY).await
    }

    /// Records whose state is in `mask`, in server order. An empty mask
    /// returns everything.
    #[instrument(skip(self, receipt))]
    pub async fn get_entitlements(
        &self,
        receipt: impl AsRef<[u8]>,
        mask: StateMask,
    ) -> Result<Vec<AutoRenewable>> {
        let request = self.request_for(receipt);
        let response = self.verify_receipt(&request).await?;
        let in_apps = response.parse_latest_receipt_info()?;
        let total = in_apps.len();

        let subscriptions = extract_auto_renewables(in_apps, mask, OffsetDateTime::now_utc());

        info!(
            environment = ?response.environment,
            total,
            matched = subscriptions.len(),
            "Verified App Store receipt"
        );

        Ok(subscriptions)
    }

    async fn verify_at(
        &self,
        request: &ReceiptRequest,
        environment: Environment,
    ) -> Result<ReceiptResponse> {
        let url = match environment {
            Environment::Sandbox => self.config.sandbox_url.as_str(),
            _ => self.config.production_url.as_str(),
        };

        let mut response = transport::verify_receipt(
            &self.http_client,
            request,
            url,
            self.config.max_retries,
            Duration::from_millis(self.config.retry_backoff_ms),
        )
        .await?;

        if response.environment.is_none() {
            response.environment = Some(environment);
        }
        Ok(response)
    }
}
