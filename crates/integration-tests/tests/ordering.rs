//! Cart, order placement and the staff state machine.
//!
//! These tests require a running, migrated server (see the crate docs).

use cafe_calories_integration_tests::Api;
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_scenario_totals_and_pickup_code() {
    let api = Api::new();
    let (owner, cafe_id) = api.cafe(35.7796, -78.6382).await;
    let item_id = api.item(&owner, cafe_id, 550, 8.99).await;
    let customer = api.account("user").await;

    api.add_to_cart(&customer, item_id, 2).await;
    let order = api.place(&customer, cafe_id).await;

    assert_eq!(order["total_calories"], 1100);
    assert_eq!(order["total_price"], json!(17.98));
    assert_eq!(order["status"], "PENDING");
    let code = order["pickup_code"].as_str().unwrap_or_default();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| matches!(c, 'A'..='F' | '0'..='9')), "{code}");

    let order_id = order["id"].as_i64().unwrap_or_default();
    let items = api
        .expect_json(
            Method::GET,
            &format!("/orders/{order_id}/items"),
            Some(&customer),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(items.as_array().map(Vec::len), Some(1));
    assert_eq!(items[0]["subtotal_calories"], 1100);

    let summary = api
        .expect_json(Method::GET, "/cart/summary", Some(&customer), None, StatusCode::OK)
        .await;
    assert_eq!(summary["total_calories"], 0);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_empty_and_mixed_carts_are_rejected() {
    let api = Api::new();
    let (owner_a, cafe_a) = api.cafe(35.78, -78.64).await;
    let (owner_b, cafe_b) = api.cafe(35.79, -78.65).await;
    let item_a = api.item(&owner_a, cafe_a, 100, 1.00).await;
    let item_b = api.item(&owner_b, cafe_b, 200, 2.00).await;
    let customer = api.account("user").await;

    let body = api
        .expect_json(
            Method::POST,
            "/orders/place",
            Some(&customer),
            Some(json!({ "cafe_id": cafe_a })),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(body["detail"], "Cart is empty");

    api.add_to_cart(&customer, item_a, 1).await;
    api.add_to_cart(&customer, item_b, 1).await;
    api.expect_json(
        Method::POST,
        "/orders/place",
        Some(&customer),
        Some(json!({ "cafe_id": cafe_a })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_clear_cart_is_idempotent() {
    let api = Api::new();
    let customer = api.account("user").await;

    for _ in 0..2 {
        let body = api
            .expect_json(Method::DELETE, "/cart/clear", Some(&customer), None, StatusCode::OK)
            .await;
        assert_eq!(body["status"], "cleared");
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_lines_for_other_people() {
    let api = Api::new();
    let (owner, cafe_id) = api.cafe(35.78, -78.64).await;
    let item_id = api.item(&owner, cafe_id, 300, 4.50).await;
    let customer = api.account("user").await;
    let friend = api.account("user").await;

    api.expect_json(
        Method::POST,
        "/cart/add",
        Some(&customer),
        Some(json!({ "item_id": item_id, "quantity": 1, "assignee_email": "nobody@example.com" })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    api.expect_json(
        Method::POST,
        "/cart/add",
        Some(&customer),
        Some(json!({ "item_id": item_id, "quantity": 2, "assignee_email": friend.email })),
        StatusCode::CREATED,
    )
    .await;
    api.add_to_cart(&customer, item_id, 1).await;

    let summary = api
        .expect_json(Method::GET, "/cart/summary", Some(&customer), None, StatusCode::OK)
        .await;
    assert_eq!(summary["by_person"][&friend.email]["calories"], 600);
    assert_eq!(summary["by_person"][&customer.email]["calories"], 300);
    assert_eq!(summary["total_price"], json!(13.5));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_can_cancel_pending_order() {
    let api = Api::new();
    let (owner, cafe_id) = api.cafe(35.78, -78.64).await;
    let item_id = api.item(&owner, cafe_id, 100, 1.00).await;
    let customer = api.account("user").await;
    let stranger = api.account("user").await;

    api.add_to_cart(&customer, item_id, 1).await;
    let order_id = api.place(&customer, cafe_id).await["id"]
        .as_i64()
        .unwrap_or_default();

    api.expect_json(
        Method::POST,
        &format!("/orders/{order_id}/cancel"),
        Some(&stranger),
        None,
        StatusCode::NOT_FOUND,
    )
    .await;

    let cancelled = api
        .expect_json(
            Method::POST,
            &format!("/orders/{order_id}/cancel"),
            Some(&customer),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(cancelled["status"], "CANCELLED");

    api.expect_json(
        Method::POST,
        &format!("/orders/{order_id}/cancel"),
        Some(&customer),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_staff_state_machine() {
    let api = Api::new();
    let (owner, cafe_id) = api.cafe(35.78, -78.64).await;
    let item_id = api.item(&owner, cafe_id, 100, 1.00).await;
    let customer = api.account("user").await;
    let staff = api.account("staff").await;

    api.expect_json(
        Method::POST,
        &format!("/cafes/{cafe_id}/staff"),
        Some(&owner),
        Some(json!({ "email": staff.email })),
        StatusCode::CREATED,
    )
    .await;

    api.add_to_cart(&customer, item_id, 1).await;
    let order_id = api.place(&customer, cafe_id).await["id"]
        .as_i64()
        .unwrap_or_default();

    api.expect_json(
        Method::POST,
        &format!("/orders/{order_id}/status?new_status=ACCEPTED"),
        Some(&customer),
        None,
        StatusCode::FORBIDDEN,
    )
    .await;

    let body = api
        .expect_json(
            Method::POST,
            &format!("/orders/{order_id}/status?new_status=PICKED_UP"),
            Some(&staff),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(body["detail"], "Invalid status transition: PENDING -> PICKED_UP");

    api.advance(&staff, order_id, "ACCEPTED").await;
    api.advance(&staff, order_id, "READY").await;
    let order = api.advance(&staff, order_id, "PICKED_UP").await;
    assert_eq!(order["status"], "PICKED_UP");

    api.expect_json(
        Method::POST,
        &format!("/orders/{order_id}/status?new_status=READY"),
        Some(&staff),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let listed = api
        .expect_json(
            Method::GET,
            &format!("/orders/{cafe_id}?status=PICKED_UP"),
            Some(&staff),
            None,
            StatusCode::OK,
        )
        .await;
    assert!(
        listed
            .as_array()
            .is_some_and(|orders| orders.iter().any(|o| o["id"].as_i64() == Some(order_id)))
    );
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_intake_counts_orders_for_the_assignee() {
    let api = Api::new();
    let (owner, cafe_id) = api.cafe(35.78, -78.64).await;
    let item_id = api.item(&owner, cafe_id, 420, 3.00).await;
    let customer = api.account("user").await;

    api.add_to_cart(&customer, item_id, 2).await;
    api.place(&customer, cafe_id).await;

    let intake = api
        .expect_json(Method::GET, "/goals/intake/today", Some(&customer), None, StatusCode::OK)
        .await;
    assert_eq!(intake["calories"], 840);
}
