//! `POST /users` — the only HTTP entry point this service exposes.

use crate::error::IdentityError;
use crate::AppUserService;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub fn router(service: Arc<AppUserService>) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/health", axum::routing::get(|| async { "OK" }))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    email: String,
    full_name: String,
    country_code: String,
}

#[derive(Debug, Serialize)]
struct CreateUserResponse {
    user_id: Uuid,
    email: String,
}

async fn create_user(
    State(service): State<Arc<AppUserService>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let user = service
        .create_user(&request.email, &request.full_name, &request.country_code)
        .await?;

    Ok(Json(CreateUserResponse {
        user_id: user.id,
        email: user.email,
    }))
}

struct ApiError(IdentityError);

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
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
