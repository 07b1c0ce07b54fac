use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::{
    receipt::{deserialize_flag, InApp, LegacyInApp, PendingRenewal, Receipt},
    status::{check_status, STATUS_OK, STATUS_SUBSCRIPTION_EXPIRED},
};
use crate::error::Result;

/// Which verifyReceipt endpoint produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Sandbox,
    Production,
    #[serde(other)]
    Unknown,
}

/// Decoded verifyReceipt response.
///
/// Payload sections stay as raw JSON until one of the `parse_*` methods
/// asks for them, so a malformed section only fails the caller that
/// actually needs it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiptResponse {
    pub status: i32,
    /// Only meaningful for statuses 21100-21199
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_retryable: bool,
    /// Reported by Apple, or stamped by the transport from the endpoint
    /// that answered.
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub receipt: Option<Box<RawValue>>,
    /// Base64 PKCS #7 of the latest app receipt
    #[serde(default)]
    pub latest_receipt: Option<String>,
    #[serde(default)]
    pub latest_receipt_info: Option<Box<RawValue>>,
    /// iOS 6 style responses only
    #[serde(default)]
    pub latest_expired_receipt_info: Option<Box<RawValue>>,
    #[serde(default)]
    pub pending_renewal_info: Option<Box<RawValue>>,
}

/// Transactions of a response, resolved once from its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptPayload {
    /// `latest_receipt_info` is an array of current-shape transactions
    Current(Vec<InApp>),
    /// Status 21006: single iOS 6 style objects in the active and the
    /// most recently expired slot
    Legacy {
        latest: Option<LegacyInApp>,
        latest_expired: Option<LegacyInApp>,
    },
}

impl ReceiptPayload {
    /// Canonical records, in server order (active slot before expired).
    pub fn into_in_apps(self) -> Vec<InApp> {
        match self {
            ReceiptPayload::Current(in_apps) => in_apps,
            ReceiptPayload::Legacy {
                latest,
                latest_expired,
            } => latest
                .into_iter()
                .chain(latest_expired)
                .map(LegacyInApp::into_in_app)
                .collect(),
        }
    }
}

impl ReceiptResponse {
    /// Statuses whose payload sections may be read: success, and the
    /// legacy "valid but expired" answer.
    pub fn ensure_readable(&self) -> Result<()> {
        if self.status == STATUS_SUBSCRIPTION_EXPIRED {
            return Ok(());
        }
        match check_status(self.status) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.status == STATUS_SUBSCRIPTION_EXPIRED
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn payload(&self) -> Result<ReceiptPayload> {
        self.ensure_readable()?;

        if self.is_legacy() {
            return Ok(ReceiptPayload::Legacy {
                latest: decode_section(&self.latest_receipt_info)?,
                latest_expired: decode_section(&self.latest_expired_receipt_info)?,
            });
        }

        let in_apps: Option<Vec<InApp>> = decode_section(&self.latest_receipt_info)?;
        Ok(ReceiptPayload::Current(in_apps.unwrap_or_default()))
    }

    /// Every transaction in `latest_receipt_info`, whatever the response
    /// generation.
    pub fn parse_latest_receipt_info(&self) -> Result<Vec<InApp>> {
        Ok(self.payload()?.into_in_apps())
    }

    pub fn parse_receipt(&self) -> Result<Receipt> {
        self.ensure_readable()?;
        Ok(decode_section(&self.receipt)?.unwrap_or_default())
    }

    /// Raw bytes of the latest receipt; empty when Apple sent none.
    pub fn parse_latest_receipt(&self) -> Result<Vec<u8>> {
        self.ensure_readable()?;
        match self.latest_receipt.as_deref() {
            Some(encoded) if !encoded.is_empty() => Ok(STANDARD.decode(encoded)?),
            _ => Ok(Vec::new()),
        }
    }

    pub fn parse_pending_renewal_info(&self) -> Result<Vec<PendingRenewal>> {
        self.ensure_readable()?;
        let renewals: Option<Vec<PendingRenewal>> = decode_section(&self.pending_renewal_info)?;
        Ok(renewals.unwrap_or_default())
    }
}

/// `None` for an absent or `null` section.
fn decode_section<T: serde::de::DeserializeOwned>(section: &Option<Box<RawValue>>) -> Result<Option<T>> {
    match section {
        Some(raw) if raw.get().trim() != "null" => Ok(Some(serde_json::from_str(raw.get())?)),
        _ => Ok(None),
    }
}
