use serde::{de, Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::timestamp::ReceiptTime;

/// Body of a verifyReceipt call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRequest {
    /// Base64 receipt, forwarded untouched
    #[serde(rename = "receipt-data")]
    pub receipt_data: String,
    /// Shared secret; only required for auto-renewable subscriptions
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(rename = "exclude-old-transactions", default)]
    pub exclude_old_transactions: bool,
}

impl ReceiptRequest {
    pub fn new(
        receipt: impl AsRef<[u8]>,
        password: impl Into<String>,
        exclude_old_transactions: bool,
    ) -> Self {
        Self {
            receipt_data: String::from_utf8_lossy(receipt.as_ref()).into_owned(),
            password: password.into(),
            exclude_old_transactions,
        }
    }
}

/// Decoded `receipt` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub receipt_type: String,
    #[serde(default)]
    pub bundle_id: String,
    #[serde(default)]
    pub application_version: String,
    /// "1.0" in the sandbox
    #[serde(default)]
    pub original_application_version: String,
    #[serde(rename(deserialize = "receipt_creation_date_ms"), default)]
    pub receipt_creation_date: ReceiptTime,
    /// Only present for Volume Purchase Program apps
    #[serde(rename(deserialize = "expiration_date_ms"), default)]
    pub expiration_date: ReceiptTime,
    #[serde(default)]
    pub in_app: Vec<InApp>,
}

/// One in-app purchase transaction, in the current (iOS 7+) shape.
///
/// `transaction_id` changes on every renewal; `original_transaction_id`
/// stays the same for the whole subscription.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InApp {
    #[serde(default)]
    pub app_item_id: String,
    #[serde(default)]
    pub version_external_identifier: String,
    #[serde(default)]
    pub web_order_line_item_id: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub original_transaction_id: String,
    #[serde(rename(deserialize = "purchase_date_ms"), default)]
    pub purchase_date: ReceiptTime,
    #[serde(rename(deserialize = "original_purchase_date_ms"), default)]
    pub original_purchase_date: ReceiptTime,

    /// Set when Apple support refunded the purchase or the plan was
    /// upgraded. Zero means not canceled.
    #[serde(rename(deserialize = "cancellation_date_ms"), default)]
    pub cancellation_date: ReceiptTime,
    /// 1 = issue within the app, 0 = other reason
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub cancellation_reason: i32,

    /// Past date means expired
    #[serde(rename(deserialize = "expires_date_ms"), default)]
    pub subscription_expiration_date: ReceiptTime,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "expiration_intent", default)]
    pub subscription_expiration_intent: i32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "price_consent_status", default)]
    pub subscription_price_consent_status: i32,
    #[serde(
        rename = "is_in_billing_retry_period",
        default,
        deserialize_with = "deserialize_flag"
    )]
    pub subscription_retry_flag: bool,
    #[serde(
        rename = "is_trial_period",
        default,
        deserialize_with = "deserialize_flag"
    )]
    pub subscription_trial_period: bool,
    #[serde(
        rename = "is_in_intro_offer_period",
        default,
        deserialize_with = "deserialize_flag"
    )]
    pub subscription_introductory_price_period: bool,
    #[serde(
        rename = "auto_renew_status",
        default,
        deserialize_with = "deserialize_flag"
    )]
    pub subscription_auto_renew_status: bool,
    #[serde(rename = "auto_renew_product_id", default)]
    pub subscription_auto_renew_preference: String,
}

/// Entry of the `pending_renewal_info` section.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRenewal {
    #[serde(default)]
    pub auto_renew_product_id: String,
    #[serde(default)]
    pub original_transaction_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub auto_renew_status: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub expiration_intent: i32,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_in_billing_retry_period: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub price_consent_status: i32,
    #[serde(rename(deserialize = "grace_period_expires_date_ms"), default)]
    pub grace_period_expires_date: ReceiptTime,
}

/// iOS 6 style transaction, as carried by `21006` responses and by
/// status notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyInApp {
    #[serde(flatten)]
    pub in_app: InApp,
    #[serde(default)]
    pub item_id: String,
    /// Millisecond epoch, unlike the current shape's `expires_date`
    #[serde(default)]
    pub expires_date: ReceiptTime,
    #[serde(default)]
    pub unique_vendor_identifier: String,
    #[serde(default)]
    pub unique_identifier: String,
    /// Same as `original_application_version`
    #[serde(default)]
    pub bvrs: String,
    /// Same as `bundle_id`
    #[serde(default)]
    pub bid: String,
}

impl LegacyInApp {
    /// Moves the legacy-only fields into their canonical names.
    pub fn into_in_app(self) -> InApp {
        let mut in_app = self.in_app;
        if !self.item_id.is_empty() {
            in_app.app_item_id = self.item_id;
        }
        if !self.expires_date.is_zero() {
            in_app.subscription_expiration_date = self.expires_date;
        }
        in_app
    }
}

/// Apple encodes flags as `"true"`/`"false"`, `"1"`/`"0"` or plain JSON
/// booleans depending on the section.
pub(crate) fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Flag::Bool(b)) => Ok(b),
        Some(Flag::Int(i)) => Ok(i != 0),
        Some(Flag::Str(s)) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Str(other),
                &"a boolean flag",
            )),
        },
    }
}
