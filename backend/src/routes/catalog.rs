use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use shared::{ApiError, CategoryResponse, PriorityResponse, StatusKind, StatusResponse};
use std::sync::Arc;

use crate::db::schema::{categories, priorities, statuses};
use crate::models::{Category, Priority, Status};
use crate::AppState;

pub async fn priorities(State(state): State<Arc<AppState>>) -> impl IntoResponse {
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

    let rows: Vec<Priority> = match priorities::table
        .order(priorities::level.asc())
        .load(&mut conn)
        .await
    {
        Ok(p) => p,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch priorities")),
            )
                .into_response()
        }
    };

    let result: Vec<PriorityResponse> = rows
        .into_iter()
        .map(|p| PriorityResponse {
            id: p.id,
            name: p.name,
            level: p.level,
            color: p.color,
        })
        .collect();

    Json(result).into_response()
}

#[derive(Debug, Deserialize)]
pub struct StatusesQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn statuses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusesQuery>,
) -> impl IntoResponse {
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

    let mut statuses_query = statuses::table
        .order(statuses::sort_order.asc())
        .into_boxed();
    if let Some(ref kind) = query.kind {
        statuses_query = statuses_query.filter(statuses::kind.eq(kind));
    }

    let rows: Vec<Status> = match statuses_query.load(&mut conn).await {
        Ok(s) => s,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch statuses")),
            )
                .into_response()
        }
    };

    let result: Vec<StatusResponse> = rows
        .into_iter()
        .map(|s| StatusResponse {
            id: s.id,
            name: s.name,
            kind: if s.kind == StatusKind::Project.as_str() {
                StatusKind::Project
            } else {
                StatusKind::Demand
            },
            sort_order: s.sort_order,
            color: s.color,
        })
        .collect();

    Json(result).into_response()
}

pub async fn categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
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

    let rows: Vec<Category> = match categories::table
        .order(categories::name.asc())
        .load(&mut conn)
        .await
    {
        Ok(c) => c,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch categories")),
            )
                .into_response()
        }
    };

    let result: Vec<CategoryResponse> = rows
        .into_iter()
        .map(|c| CategoryResponse {
            id: c.id,
            name: c.name,
            description: c.description,
            color: c.color,
            created_at: c.created_at,
        })
        .collect();

    Json(result).into_response()
}
