use serde::Deserialize;

use super::{
    receipt::{deserialize_flag, InApp, LegacyInApp},
    timestamp::ReceiptTime,
};

/// Kind of a (v1) App Store status-update notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    InitialBuy,
    /// Canceled by Apple support, or upgraded to another plan
    Cancel,
    Renewal,
    InteractiveRenewal,
    /// Plan change taking effect at the next renewal
    DidChangeRenewalPref,
    /// Auto-renew switched on or off; see `auto_renew_status`
    DidChangeRenewalStatus,
    DidFailToRenew,
    DidRecover,
    DidRenew,
    PriceIncreaseConsent,
    Refund,
    Revoke,
    #[serde(other)]
    Unknown,
}

/// Server-to-server status notification posted by the App Store.
///
/// Many fields are only posted for some notification types and several
/// never show up in the sandbox, so everything defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusNotification {
    pub notification_type: NotificationType,
    /// "PROD" or "Sandbox"
    #[serde(default)]
    pub environment: String,
    /// The shared secret
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub original_transaction_id: String,
    #[serde(default)]
    pub web_order_line_item_id: String,
    /// CANCEL only
    #[serde(rename = "cancellation_date_ms", default)]
    pub cancellation_date: ReceiptTime,
    /// Present after a successful (re)purchase; absent for CANCEL
    #[serde(default)]
    pub latest_receipt: String,
    #[serde(default)]
    pub latest_receipt_info: Option<LegacyInApp>,
    #[serde(default)]
    pub latest_expired_receipt: String,
    #[serde(default)]
    pub latest_expired_receipt_info: Option<LegacyInApp>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub auto_renew_status: bool,
    #[serde(rename = "auto_renew_status_change_date_ms", default)]
    pub auto_renew_status_change_date: ReceiptTime,
    #[serde(default)]
    pub auto_renew_product_id: String,
    #[serde(default)]
    pub auto_renew_adam_id: String,
    #[serde(default)]
    pub expiration_intent: String,
}

impl StatusNotification {
    pub fn from_json(body: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// The subscription this notification is about, in canonical shape.
    ///
    /// Without `latest_receipt` the notification is a cancel-style one
    /// and only the expired slot is meaningful.
    pub fn subscription(&self) -> Option<InApp> {
        let slot = if self.latest_receipt.is_empty() {
            &self.latest_expired_receipt_info
        } else {
            &self.latest_receipt_info
        };
        slot.clone().map(LegacyInApp::into_in_app)
    }

    pub fn password_matches(&self, shared_secret: &str) -> bool {
        !shared_secret.is_empty() && self.password == shared_secret
    }

    pub fn is_sandbox(&self) -> bool {
        self.environment.eq_ignore_ascii_case("sandbox")
    }
}
