use crate::fake_app_store::{ms_from_now, test_config, FakeAppStore};
use axum::http::StatusCode;
use receiptkit::{
    models::Environment, IAPConfig, ReceiptError, ReceiptService, StateMask, SubscriptionState,
};
use serde_json::{json, Value};
use std::time::Duration;

fn subscription(transaction_id: &str, expires_in_days: i64, extra: Value) -> Value {
    let mut record = json!({
        "quantity": "1",
        "product_id": "com.example.pro.monthly",
        "transaction_id": transaction_id,
        "original_transaction_id": "1000000500000001",
        "purchase_date_ms": ms_from_now(expires_in_days - 30),
        "original_purchase_date_ms": ms_from_now(-90),
        "expires_date_ms": ms_from_now(expires_in_days),
        "is_trial_period": "false",
        "is_in_intro_offer_period": "false"
    });
    for (key, value) in extra.as_object().unwrap() {
        record[key] = value.clone();
    }
    record
}

fn mixed_receipt_reply() -> Value {
    json!({
        "status": 0,
        "latest_receipt_info": [
            subscription("11", -40, json!({})),
            subscription("12", -10, json!({"is_trial_period": "true"})),
            subscription("13", 20, json!({})),
            subscription("14", 5, json!({"is_in_intro_offer_period": "true"})),
            subscription("15", 25, json!({"cancellation_date_ms": ms_from_now(-1)}))
        ]
    })
}

fn ids(subs: &[receiptkit::AutoRenewable]) -> Vec<&str> {
    subs.iter().map(|s| s.in_app.transaction_id.as_str()).collect()
}

#[tokio::test]
async fn test_production_success_does_not_touch_sandbox() {
    let production = FakeAppStore::start(vec![mixed_receipt_reply()]).await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 0})]).await;
    let service = ReceiptService::new(&test_config(&production, &sandbox)).unwrap();

    let request = service.request_for("cmVjZWlwdA==");
    let response = service.verify_receipt(&request).await.unwrap();

    assert_eq!(response.status, 0);
    assert_eq!(response.environment, Some(Environment::Production));
    assert_eq!(production.hits(), 1);
    assert_eq!(sandbox.hits(), 0);
}

#[tokio::test]
async fn test_sandbox_receipt_falls_back_once() {
    let production = FakeAppStore::start(vec![json!({"status": 21007})]).await;
    let sandbox = FakeAppStore::start(vec![mixed_receipt_reply()]).await;
    let service = ReceiptService::new(&test_config(&production, &sandbox)).unwrap();

    let request = service.request_for("cmVjZWlwdA==");
    let response = service.verify_receipt(&request).await.unwrap();

    assert_eq!(production.hits(), 1);
    assert_eq!(sandbox.hits(), 1);
    assert_eq!(response.status, 0);
    assert_eq!(response.environment, Some(Environment::Sandbox));

    // Same request body went to both endpoints
    assert_eq!(production.requests()[0].1, sandbox.requests()[0].1);
}

#[tokio::test]
async fn test_fallback_is_not_recursive() {
    let production = FakeAppStore::start(vec![json!({"status": 21007})]).await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 21007})]).await;
    let service = ReceiptService::new(&test_config(&production, &sandbox)).unwrap();

    let response = service
        .verify_receipt(&service.request_for("cmVjZWlwdA=="))
        .await
        .unwrap();

    assert_eq!(response.status, 21007);
    assert_eq!(production.hits(), 1);
    assert_eq!(sandbox.hits(), 1);
}

#[tokio::test]
async fn test_sandbox_mode_only_calls_sandbox() {
    let production = FakeAppStore::start(vec![json!({"status": 0})]).await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 21008})]).await;
    let config = IAPConfig {
        sandbox: true,
        ..test_config(&production, &sandbox)
    };
    let service = ReceiptService::new(&config).unwrap();

    let result = service.get_auto_renewables("cmVjZWlwdA==").await;

    match result {
        Err(ReceiptError::Verification(e)) => assert_eq!(e.status, 21008),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(production.hits(), 0);
    assert_eq!(sandbox.hits(), 1);
}

#[tokio::test]
async fn test_entitlements_are_classified_and_filtered() {
    let production = FakeAppStore::start(vec![mixed_receipt_reply()]).await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 0})]).await;
    let service = ReceiptService::new(&test_config(&production, &sandbox)).unwrap();

    let all = service.get_auto_renewables("cmVjZWlwdA==").await.unwrap();
    assert_eq!(ids(&all), ["11", "12", "13", "14", "15"]);
    let states: Vec<_> = all.iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        [
            SubscriptionState::Expired,
            SubscriptionState::Expired,
            SubscriptionState::Active,
            SubscriptionState::Free,
            SubscriptionState::Canceled,
        ]
    );

    let live = service
        .get_entitlements("cmVjZWlwdA==", StateMask::entitled())
        .await
        .unwrap();
    assert_eq!(ids(&live), ["13", "14"]);
    assert!(live
        .iter()
        .all(|s| s.in_app.original_transaction_id == "1000000500000001"));

    let gone = service
        .get_entitlements(
            "cmVjZWlwdA==",
            SubscriptionState::Expired | SubscriptionState::Canceled,
        )
        .await
        .unwrap();
    assert_eq!(ids(&gone), ["11", "12", "15"]);
}

#[tokio::test]
async fn test_legacy_expired_response_is_normalized() {
    let production = FakeAppStore::start(vec![json!({
        "status": 21006,
        "latest_receipt_info": {
            "item_id": "521129812",
            "expires_date": ms_from_now(-2),
            "product_id": "com.example.pro.weekly",
            "transaction_id": "22",
            "original_transaction_id": "20"
        },
        "latest_expired_receipt_info": {
            "item_id": "521129812",
            "expires_date": ms_from_now(-9),
            "product_id": "com.example.pro.weekly",
            "transaction_id": "21",
            "original_transaction_id": "20"
        }
    })])
    .await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 0})]).await;
    let service = ReceiptService::new(&test_config(&production, &sandbox)).unwrap();

    let subs = service.get_auto_renewables("cmVjZWlwdA==").await.unwrap();

    assert_eq!(ids(&subs), ["22", "21"]);
    assert!(subs.iter().all(|s| s.state == SubscriptionState::Expired));
    assert!(subs.iter().all(|s| s.in_app.app_item_id == "521129812"));
}

#[tokio::test]
async fn test_exhausted_retries_surface_status_error() {
    let production = FakeAppStore::start(vec![json!({"status": 21199, "is_retryable": true})]).await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 0})]).await;
    let config = IAPConfig {
        max_retries: 2,
        ..test_config(&production, &sandbox)
    };
    let service = ReceiptService::new(&config).unwrap();

    let err = service
        .get_entitlements("cmVjZWlwdA==", StateMask::entitled())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(21199));
    assert_eq!(err.to_string(), "Internal data access error (status 21199)");
    assert_eq!(production.hits(), 3);
    assert_eq!(sandbox.hits(), 0);
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let production = FakeAppStore::start_raw(
        vec![(StatusCode::OK, json!({"status": 0}).to_string())],
        Duration::from_secs(5),
    )
    .await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 0})]).await;
    let config = IAPConfig {
        request_timeout_ms: 100,
        max_retries: 3,
        ..test_config(&production, &sandbox)
    };
    let service = ReceiptService::new(&config).unwrap();

    let result = service.get_auto_renewables("cmVjZWlwdA==").await;

    assert!(matches!(result, Err(ReceiptError::Transport(_))));
    assert_eq!(production.hits(), 1);
}

#[tokio::test]
async fn test_concurrent_callers_do_not_interfere() {
    let production = FakeAppStore::start(vec![mixed_receipt_reply()]).await;
    let sandbox = FakeAppStore::start(vec![json!({"status": 0})]).await;
    let service = ReceiptService::new(&test_config(&production, &sandbox)).unwrap();

    let mut handles = vec![];
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .get_entitlements("cmVjZWlwdA==", StateMask::entitled())
                .await
        }));
    }

    for handle in handles {
        let live = handle.await.unwrap().unwrap();
        assert_eq!(ids(&live), ["13", "14"]);
    }
    assert_eq!(production.hits(), 8);
}
