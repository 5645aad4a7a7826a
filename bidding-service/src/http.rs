//! The single HTTP entry point named as an external collaborator in spec.md §1/§6:
//! `POST /items/:item_id/bids`. Thin JSON framing over [`crate::AppBidService`];
//! everything but error-code mapping is delegated to the domain service.

use crate::error::BidError;
use crate::AppBidService;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub fn router(service: Arc<AppBidService>) -> Router {
    Router::new()
        .route("/items/:item_id/bids", post(place_bid))
        .route("/health", axum::routing::get(|| async { "OK" }))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct PlaceBidRequest {
    user_id: Uuid,
    amount: i64,
}

#[derive(Debug, Serialize)]
struct PlaceBidResponse {
    bid_id: Uuid,
    item_id: Uuid,
    amount: i64,
}

async fn place_bid(
    State(service): State<Arc<AppBidService>>,
    Path(item_id): Path<Uuid>,
    Json(request): Json<PlaceBidRequest>,
) -> Result<Json<PlaceBidResponse>, ApiError> {
    let bid = service
        .place_bid(item_id, request.user_id, request.amount)
        .await?;

    Ok(Json(PlaceBidResponse {
        bid_id: bid.id,
        item_id: bid.item_id,
        amount: bid.amount,
    }))
}

struct ApiError(BidError);

impl From<BidError> for ApiError {
    fn from(err: BidError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.0.to_response();
        (StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(body))
            .into_response()
    }
}
