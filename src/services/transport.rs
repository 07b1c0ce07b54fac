use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, StatusCode};
use tracing::{debug, instrument, warn};

use crate::{
    error::{ReceiptError, Result},
    models::{status::STATUS_OK, ReceiptRequest, ReceiptResponse},
};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Posts `request` to a verifyReceipt endpoint.
///
/// While Apple answers with a non-zero status flagged `is_retryable`, the
/// same request is sent again to the same URL, at most `max_retries`
/// extra times, waiting `backoff * attempt` in between. The last decoded
/// response is returned as-is, including a non-zero status; only the
/// HTTP round trip and JSON decoding produce errors here.
///
/// Dropping the returned future aborts the in-flight request.
#[instrument(skip(client, request, backoff), fields(url = %url))]
pub async fn verify_receipt(
    client: &reqwest::Client,
    request: &ReceiptRequest,
    url: &str,
    max_retries: u32,
    backoff: Duration,
) -> Result<ReceiptResponse> {
    let body = serde_json::to_vec(request)?;
    let mut retries_left = max_retries;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let response = send_once(client, &body, url).await?;
        debug!(status = response.status, attempts, "App Store answered");

        if response.status != STATUS_OK && response.is_retryable && retries_left > 0 {
            retries_left -= 1;
            warn!(
                status = response.status,
                attempts, retries_left, "App Store reported a retryable status, retrying"
            );
            if !backoff.is_zero() {
                tokio::time::sleep(backoff * attempts).await;
            }
            continue;
        }

        return Ok(response);
    }
}

async fn send_once(client: &reqwest::Client, body: &[u8], url: &str) -> Result<ReceiptResponse> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(body.to_vec())
        .send()
        .await?;

    if response.status() != StatusCode::OK {
        return Err(ReceiptError::HttpStatus(response.status().as_u16()));
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
