//! The caller's cart.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use cafe_calories_core::cart::CartSummary;
use cafe_calories_core::{CartItemId, ItemId};

use super::StatusResponse;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::CartView;
use crate::services::CartService;
use crate::services::cart::AddToCart;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add", post(add))
        .route("/summary", get(summary))
        .route("/clear", delete(clear))
}

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub item_id: ItemId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Who the line is for; the caller when absent.
    pub assignee_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub status: &'static str,
    pub cart_item_id: CartItemId,
}

/// # Errors
///
/// 500 on database failure.
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(state.pool()).view(&user).await?))
}

/// # Errors
///
/// 422 for a quantity below one, 404 for a missing or inactive item, 400
/// when the assignee is not an active user.
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<AddToCartResponse>)> {
    let line = AddToCart {
        item_id: body.item_id,
        quantity: body.quantity,
        assignee_email: body.assignee_email,
    };
    let cart_item_id = CartService::new(state.pool()).add(&user, &line).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddToCartResponse {
            status: "added",
            cart_item_id,
        }),
    ))
}

/// Per-person subtotals and grand totals.
///
/// # Errors
///
/// 500 on database failure.
pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartSummary>> {
    Ok(Json(CartService::new(state.pool()).summary(&user).await?))
}

/// # Errors
///
/// 500 on database failure.
pub async fn clear(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StatusResponse>> {
    CartService::new(state.pool()).clear(&user).await?;
    Ok(Json(StatusResponse::new("cleared")))
}
