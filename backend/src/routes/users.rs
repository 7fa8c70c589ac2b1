use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use shared::{ApiError, Role, UserResponse};
use std::sync::Arc;

use crate::db::schema::users;
use crate::models::User;
use crate::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut conn = match state.pool.get().await {
        Ok(c) => c,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Database connection failed")),
            )
                .into_response()
        }
    };

    let all_users: Vec<User> = match users::table.order(users::name.asc()).load(&mut conn).await {
        Ok(u) => u,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch users")),
            )
                .into_response()
        }
    };

    // Password hashes never leave the database layer
    let result: Vec<UserResponse> = all_users
        .into_iter()
        .map(|u| UserResponse {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role.parse().unwrap_or(Role::TeamMember),
            skills: serde_json::from_str(&u.skills).unwrap_or_default(),
            capacity: u.capacity,
            created_at: u.created_at,
        })
        .collect();

    Json(result).into_response()
}
