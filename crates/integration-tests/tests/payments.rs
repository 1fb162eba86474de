//! Mock payments and refunds.
//!
//! These tests require a running, migrated server (see the crate docs). The
//! refund resolution test also needs `CAFE_ADMIN_EMAIL`/`CAFE_ADMIN_PASSWORD`.

use cafe_calories_integration_tests::{Api, Session};
use reqwest::{Method, StatusCode};
use serde_json::json;

async fn paid_order(api: &Api) -> (Session, i64) {
    let (owner, cafe_id) = api.cafe(35.78, -78.64).await;
    let item_id = api.item(&owner, cafe_id, 100, 6.25).await;
    let customer = api.account("user").await;
    api.add_to_cart(&customer, item_id, 2).await;
    let order_id = api.place(&customer, cafe_id).await["id"]
        .as_i64()
        .unwrap_or_default();

    let payment = api
        .expect_json(
            Method::POST,
            &format!("/payments/{order_id}"),
            Some(&customer),
            None,
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(payment["provider"], "MOCK");
    assert_eq!(payment["status"], "PAID");
    assert_eq!(payment["amount"], json!(12.5));
    (customer, order_id)
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_cannot_be_paid_twice() {
    let api = Api::new();
    let (customer, order_id) = paid_order(&api).await;

    api.expect_json(
        Method::POST,
        &format!("/payments/{order_id}"),
        Some(&customer),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server, database and an admin account"]
async fn test_approved_refund_marks_order_refunded() {
    let api = Api::new();
    let (customer, order_id) = paid_order(&api).await;
    let admin = api.admin().await;

    let refund = api
        .expect_json(
            Method::POST,
            &format!("/orders/{order_id}/refund"),
            Some(&customer),
            Some(json!({ "reason": "Wrong order delivered" })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(refund["status"], "PENDING");
    let refund_id = refund["id"].as_i64().unwrap_or_default();

    api.expect_json(
        Method::POST,
        &format!("/orders/{order_id}/refund"),
        Some(&customer),
        Some(json!({ "reason": "Again" })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let decision = api
        .expect_json(
            Method::POST,
            &format!("/admin/refunds/{refund_id}/approve"),
            Some(&admin),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(decision["refund"]["status"], "APPROVED");
    assert_eq!(decision["order"]["status"], "REFUNDED");

    api.expect_json(
        Method::POST,
        &format!("/admin/refunds/{refund_id}/reject"),
        Some(&admin),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
}
