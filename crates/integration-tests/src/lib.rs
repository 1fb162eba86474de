//! End-to-end tests for Cafe Calories.
//!
//! # Running Tests
//!
//! ```bash
//! # Database up and migrated, server running
//! cc-cli migrate
//! cargo run -p cafe-calories-server
//!
//! # Run the ignored end-to-end tests
//! cargo test -p cafe-calories-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `CAFE_BASE_URL` - Server under test (default: `http://127.0.0.1:8000`)
//! - `CAFE_ADMIN_EMAIL` / `CAFE_ADMIN_PASSWORD` - An admin created with
//!   `cc-cli admin create`, for the admin-only scenarios
//!
//! Every test registers fresh accounts with unique emails, so runs do not
//! interfere with each other or with existing data.

use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Password used for every account the tests register.
pub const PASSWORD: &str = "integration-pass-1";

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("CAFE_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
}

/// An email nobody has registered yet.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// A random point on land-ish latitudes, far from where other runs put
/// their cafes and drivers.
#[must_use]
pub fn random_spot() -> (f64, f64) {
    let bits = Uuid::new_v4().as_u128();
    let lat = -50.0 + f64::from(u32::try_from(bits % 10_000).unwrap_or_default()) / 100.0;
    let lng = -150.0 + f64::from(u32::try_from((bits >> 32) % 30_000).unwrap_or_default()) / 100.0;
    (lat, lng)
}

/// A logged-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub email: String,
    pub token: String,
}

/// Thin JSON client over the API.
#[derive(Debug, Clone)]
pub struct Api {
    client: Client,
    base: String,
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl Api {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Send a request, optionally authenticated and with a JSON body.
    ///
    /// # Panics
    ///
    /// If the server cannot be reached.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        session: Option<&Session>,
        body: Option<Value>,
    ) -> Response {
        let mut request = self.client.request(method, self.url(path));
        if let Some(session) = session {
            request = request.bearer_auth(&session.token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.expect("Failed to reach server")
    }

    /// Send and decode, asserting the status.
    ///
    /// # Panics
    ///
    /// If the status differs or the body is not JSON.
    pub async fn expect_json(
        &self,
        method: Method,
        path: &str,
        session: Option<&Session>,
        body: Option<Value>,
        status: StatusCode,
    ) -> Value {
        let response = self.send(method.clone(), path, session, body).await;
        let actual = response.status();
        let json: Value = response.json().await.unwrap_or(Value::Null);
        assert_eq!(actual, status, "{method} {path} returned {json}");
        json
    }

    /// Register with `role` and log in.
    ///
    /// # Panics
    ///
    /// If registration or login fails.
    pub async fn account(&self, role: &str) -> Session {
        let email = unique_email(role);
        let user = self
            .expect_json(
                Method::POST,
                "/users/register",
                None,
                Some(json!({
                    "email": email,
                    "name": format!("Test {role}"),
                    "password": PASSWORD,
                    "role": role,
                })),
                StatusCode::CREATED,
            )
            .await;
        let token = self.login(&email, PASSWORD).await;
        Session {
            id: user["id"].as_i64().expect("user id"),
            email,
            token,
        }
    }

    /// # Panics
    ///
    /// If the credentials are rejected.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let tokens = self
            .expect_json(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
                StatusCode::OK,
            )
            .await;
        tokens["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// The admin configured through `CAFE_ADMIN_EMAIL`/`CAFE_ADMIN_PASSWORD`.
    ///
    /// # Panics
    ///
    /// If the variables are missing or the login fails.
    pub async fn admin(&self) -> Session {
        let email = std::env::var("CAFE_ADMIN_EMAIL").expect("CAFE_ADMIN_EMAIL not set");
        let password = std::env::var("CAFE_ADMIN_PASSWORD").expect("CAFE_ADMIN_PASSWORD not set");
        let mut session = Session {
            id: 0,
            token: self.login(&email, &password).await,
            email,
        };
        let me = self
            .expect_json(Method::GET, "/users/me", Some(&session), None, StatusCode::OK)
            .await;
        session.id = me["id"].as_i64().expect("admin id");
        session
    }

    /// An owner with a cafe at the given position.
    ///
    /// # Panics
    ///
    /// If any call fails.
    pub async fn cafe(&self, lat: f64, lng: f64) -> (Session, i64) {
        let owner = self.account("owner").await;
        let cafe = self
            .expect_json(
                Method::POST,
                "/cafes",
                Some(&owner),
                Some(json!({
                    "name": format!("Cafe {}", Uuid::new_v4().simple()),
                    "address": "1 Test Street",
                    "lat": lat,
                    "lng": lng,
                })),
                StatusCode::CREATED,
            )
            .await;
        (owner, cafe["id"].as_i64().expect("cafe id"))
    }

    /// # Panics
    ///
    /// If the item cannot be created.
    pub async fn item(&self, owner: &Session, cafe_id: i64, calories: i64, price: f64) -> i64 {
        let item = self
            .expect_json(
                Method::POST,
                &format!("/items/{cafe_id}"),
                Some(owner),
                Some(json!({
                    "name": format!("Item {}", Uuid::new_v4().simple()),
                    "calories": calories,
                    "price": price,
                })),
                StatusCode::CREATED,
            )
            .await;
        item["id"].as_i64().expect("item id")
    }

    /// Add a line to `session`'s cart.
    ///
    /// # Panics
    ///
    /// If the server rejects the line.
    pub async fn add_to_cart(&self, session: &Session, item_id: i64, quantity: i64) {
        self.expect_json(
            Method::POST,
            "/cart/add",
            Some(session),
            Some(json!({ "item_id": item_id, "quantity": quantity })),
            StatusCode::CREATED,
        )
        .await;
    }

    /// A driver whose first location report puts them idle at the point.
    ///
    /// # Panics
    ///
    /// If registration or the report fails.
    pub async fn idle_driver(&self, lat: f64, lng: f64) -> Session {
        let driver = self.account("driver").await;
        self.expect_json(
            Method::POST,
            &format!("/drivers/{}/location", driver.id),
            Some(&driver),
            Some(json!({ "lat": lat, "lng": lng, "status": "IDLE" })),
            StatusCode::CREATED,
        )
        .await;
        driver
    }

    /// Place an order from the cart.
    ///
    /// # Panics
    ///
    /// If placement fails.
    pub async fn place(&self, session: &Session, cafe_id: i64) -> Value {
        self.expect_json(
            Method::POST,
            "/orders/place",
            Some(session),
            Some(json!({ "cafe_id": cafe_id })),
            StatusCode::CREATED,
        )
        .await
    }

    /// Move an order through a staff transition.
    ///
    /// # Panics
    ///
    /// If the transition is rejected.
    pub async fn advance(&self, staff: &Session, order_id: i64, status: &str) -> Value {
        self.expect_json(
            Method::POST,
            &format!("/orders/{order_id}/status?new_status={status}"),
            Some(staff),
            None,
            StatusCode::OK,
        )
        .await
    }
}
