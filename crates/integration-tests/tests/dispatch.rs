//! Driver assignment and delivery.
//!
//! These tests require a running, migrated server (see the crate docs).

use cafe_calories_integration_tests::{Api, Session, random_spot};
use reqwest::{Method, StatusCode};
use serde_json::json;

/// An order moved to `ACCEPTED` by its cafe owner.
async fn accepted_order(api: &Api, owner: &Session, cafe_id: i64) -> i64 {
    let item_id = api.item(owner, cafe_id, 250, 5.00).await;
    let customer = api.account("user").await;
    api.add_to_cart(&customer, item_id, 1).await;
    let order_id = api.place(&customer, cafe_id).await["id"]
        .as_i64()
        .unwrap_or_default();
    api.advance(owner, order_id, "ACCEPTED").await;
    order_id
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_same_driver_is_never_assigned_twice_concurrently() {
    let api = Api::new();
    let (owner, cafe_id) = api.cafe(40.0, -105.0).await;
    let first = accepted_order(&api, &owner, cafe_id).await;
    let second = accepted_order(&api, &owner, cafe_id).await;
    let driver = api.idle_driver(40.001, -105.001).await;

    let assign = |order_id: i64| {
        let api = api.clone();
        let owner = owner.clone();
        let driver_id = driver.id;
        async move {
            api.send(
                Method::POST,
                &format!("/orders/{order_id}/assign-driver"),
                Some(&owner),
                Some(json!({ "driver_id": driver_id })),
            )
            .await
            .status()
        }
    };

    let (a, b) = tokio::join!(assign(first), assign(second));
    let successes = [a, b].iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1, "statuses: {a} {b}");
    assert!([a, b].contains(&StatusCode::BAD_REQUEST));

    let me = api
        .expect_json(Method::GET, "/drivers/me", Some(&driver), None, StatusCode::OK)
        .await;
    assert_eq!(me["status"], "OCCUPIED");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_pickup_and_delivery_release_the_driver() {
    let api = Api::new();
    let (owner, cafe_id) = api.cafe(41.0, -106.0).await;
    let order_id = accepted_order(&api, &owner, cafe_id).await;
    let driver = api.idle_driver(41.0005, -106.0005).await;
    let other_driver = api.account("driver").await;

    let order = api
        .expect_json(
            Method::POST,
            &format!("/orders/{order_id}/assign-driver"),
            Some(&owner),
            Some(json!({ "driver_id": driver.id })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(order["driver_id"].as_i64(), Some(driver.id));

    api.expect_json(
        Method::POST,
        &format!("/orders/{order_id}/assign-driver"),
        Some(&owner),
        Some(json!({ "driver_id": driver.id })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    api.expect_json(
        Method::POST,
        &format!("/drivers/{}/orders/{order_id}/pickup", other_driver.id),
        Some(&other_driver),
        None,
        StatusCode::FORBIDDEN,
    )
    .await;

    // ACCEPTED orders cannot be picked up yet
    api.expect_json(
        Method::POST,
        &format!("/drivers/{}/orders/{order_id}/pickup", driver.id),
        Some(&driver),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;

    api.advance(&owner, order_id, "READY").await;
    let picked = api
        .expect_json(
            Method::POST,
            &format!("/drivers/{}/orders/{order_id}/pickup", driver.id),
            Some(&driver),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(picked["status"], "PICKED_UP");

    let delivered = api
        .expect_json(
            Method::POST,
            &format!("/drivers/{}/orders/{order_id}/deliver", driver.id),
            Some(&driver),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(delivered["status"], "DELIVERED");

    let me = api
        .expect_json(Method::GET, "/drivers/me", Some(&driver), None, StatusCode::OK)
        .await;
    assert_eq!(me["status"], "IDLE");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_status_before_any_location_is_not_found() {
    let api = Api::new();
    let driver = api.account("driver").await;

    api.expect_json(
        Method::PUT,
        &format!("/drivers/{}/status", driver.id),
        Some(&driver),
        Some(json!({ "status": "IDLE" })),
        StatusCode::NOT_FOUND,
    )
    .await;
}

async fn auto_assign(api: &Api, staff: &Session, order_id: i64) -> (StatusCode, serde_json::Value) {
    let response = api
        .send(
            Method::POST,
            &format!("/orders/{order_id}/assign-driver"),
            Some(staff),
            None,
        )
        .await;
    let status = response.status();
    (status, response.json().await.unwrap_or_default())
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_nearest_idle_driver_is_chosen_automatically() {
    let api = Api::new();
    let (lat, lng) = random_spot();
    let (owner, cafe_id) = api.cafe(lat, lng).await;
    let order_id = accepted_order(&api, &owner, cafe_id).await;
    let far = api.idle_driver(lat + 0.02, lng + 0.02).await;
    let near = api.idle_driver(lat + 0.001, lng + 0.001).await;

    let (status, order) = auto_assign(&api, &owner, order_id).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["driver_id"].as_i64(), Some(near.id));

    let near_state = api
        .expect_json(Method::GET, "/drivers/me", Some(&near), None, StatusCode::OK)
        .await;
    assert_eq!(near_state["status"], "OCCUPIED");
    let far_state = api
        .expect_json(Method::GET, "/drivers/me", Some(&far), None, StatusCode::OK)
        .await;
    assert_eq!(far_state["status"], "IDLE");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_pending_order_cannot_get_a_driver() {
    let api = Api::new();
    let (lat, lng) = random_spot();
    let (owner, cafe_id) = api.cafe(lat, lng).await;
    let item_id = api.item(&owner, cafe_id, 300, 4.50).await;
    let customer = api.account("user").await;
    api.add_to_cart(&customer, item_id, 1).await;
    let order_id = api.place(&customer, cafe_id).await["id"]
        .as_i64()
        .unwrap_or_default();
    let driver = api.idle_driver(lat + 0.001, lng).await;

    let body = api
        .expect_json(
            Method::POST,
            &format!("/orders/{order_id}/assign-driver"),
            Some(&owner),
            Some(json!({ "driver_id": driver.id })),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(
        body["detail"].as_str().unwrap_or_default().contains("PENDING"),
        "{body}"
    );

    let me = api
        .expect_json(Method::GET, "/drivers/me", Some(&driver), None, StatusCode::OK)
        .await;
    assert_eq!(me["status"], "IDLE");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_busy_driver_cannot_take_another_order() {
    let api = Api::new();
    let (lat, lng) = random_spot();
    let (owner, cafe_id) = api.cafe(lat, lng).await;
    let first = accepted_order(&api, &owner, cafe_id).await;
    let second = accepted_order(&api, &owner, cafe_id).await;
    let driver = api.idle_driver(lat + 0.001, lng).await;

    api.expect_json(
        Method::POST,
        &format!("/orders/{first}/assign-driver"),
        Some(&owner),
        Some(json!({ "driver_id": driver.id })),
        StatusCode::OK,
    )
    .await;

    let body = api
        .expect_json(
            Method::POST,
            &format!("/orders/{second}/assign-driver"),
            Some(&owner),
            Some(json!({ "driver_id": driver.id })),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(body["detail"], "Driver is not available");

    let orders = api
        .expect_json(
            Method::GET,
            &format!("/drivers/{}/assigned-orders", driver.id),
            Some(&driver),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(orders.as_array().map(Vec::len), Some(1));
    assert_eq!(orders[0]["id"].as_i64(), Some(first));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_concurrent_automatic_assignment_claims_a_driver_once() {
    let api = Api::new();
    let (lat, lng) = random_spot();
    let (owner, cafe_id) = api.cafe(lat, lng).await;
    let first = accepted_order(&api, &owner, cafe_id).await;
    let second = accepted_order(&api, &owner, cafe_id).await;
    let driver = api.idle_driver(lat + 0.001, lng + 0.001).await;

    let ((a_status, a), (b_status, b)) = tokio::join!(
        auto_assign(&api, &owner, first),
        auto_assign(&api, &owner, second)
    );

    // The loser falls through to some other idle driver, or finds none
    for (status, body) in [(a_status, &a), (b_status, &b)] {
        assert!(
            status == StatusCode::OK
                || (status == StatusCode::BAD_REQUEST && body["detail"] == "No available drivers nearby"),
            "{status} {body}"
        );
    }
    let ours = [&a, &b]
        .iter()
        .filter(|order| order["driver_id"].as_i64() == Some(driver.id))
        .count();
    assert_eq!(ours, 1, "{a} {b}");

    let me = api
        .expect_json(Method::GET, "/drivers/me", Some(&driver), None, StatusCode::OK)
        .await;
    assert_eq!(me["status"], "OCCUPIED");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_crossed_automatic_assignments_never_fail_with_server_errors() {
    let api = Api::new();
    let (lat, lng) = random_spot();
    let (owner_a, cafe_a) = api.cafe(lat, lng).await;
    let (owner_b, cafe_b) = api.cafe(lat + 0.05, lng).await;

    let mut orders = Vec::new();
    for _ in 0..3 {
        orders.push((owner_a.clone(), accepted_order(&api, &owner_a, cafe_a).await));
        orders.push((owner_b.clone(), accepted_order(&api, &owner_b, cafe_b).await));
    }
    // Each cafe's nearest driver is the other cafe's second choice
    let near_a = api.idle_driver(lat + 0.001, lng).await;
    let near_b = api.idle_driver(lat + 0.049, lng).await;

    let results = assign_all(&api, &orders).await;
    for (status, body) in &results {
        assert!(!status.is_server_error(), "{status} {body}");
    }
    for driver in [&near_a, &near_b] {
        let taken = results
            .iter()
            .filter(|(_, order)| order["driver_id"].as_i64() == Some(driver.id))
            .count();
        assert_eq!(taken, 1, "driver {} assigned {taken} times", driver.id);
    }
}

/// Fire every automatic assignment at once.
async fn assign_all(api: &Api, orders: &[(Session, i64)]) -> Vec<(StatusCode, serde_json::Value)> {
    let handles: Vec<_> = orders
        .iter()
        .cloned()
        .map(|(staff, order_id)| {
            let api = api.clone();
            tokio::spawn(async move { auto_assign(&api, &staff, order_id).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.expect("assignment task panicked"));
    }
    results
}
