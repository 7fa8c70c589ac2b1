use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::{ApiError, CommentResponse, CreateComment, Role, StatusKind};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::schema::{comments, demands, projects, users};
use crate::models::{Comment, NewComment, User};
use crate::AppState;

use super::AuthUser;

fn kind_of(raw: &str) -> StatusKind {
    if raw == StatusKind::Project.as_str() {
        StatusKind::Project
    } else {
        StatusKind::Demand
    }
}

async fn entity_exists(
    conn: &mut AsyncPgConnection,
    kind: StatusKind,
    id: &str,
) -> Result<bool, diesel::result::Error> {
    let count: i64 = match kind {
        StatusKind::Demand => {
            demands::table
                .filter(demands::id.eq(id))
                .count()
                .get_result(conn)
                .await?
        }
        StatusKind::Project => {
            projects::table
                .filter(projects::id.eq(id))
                .count()
                .get_result(conn)
                .await?
        }
    };
    Ok(count > 0)
}

async fn list_internal(state: &Arc<AppState>, kind: StatusKind, entity_id: String) -> Response {
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

    match entity_exists(&mut conn, kind, &entity_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!(
                    "{} {} not found",
                    kind.as_str(),
                    entity_id
                ))),
            )
                .into_response()
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify entity")),
            )
                .into_response()
        }
    }

    let rows: Vec<(Comment, User)> = match comments::table
        .inner_join(users::table.on(users::id.eq(comments::user_id)))
        .filter(comments::entity_type.eq(kind.as_str()))
        .filter(comments::entity_id.eq(&entity_id))
        .order(comments::created_at.desc())
        .select((Comment::as_select(), User::as_select()))
        .load(&mut conn)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch comments for {entity_id}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch comments")),
            )
                .into_response();
        }
    };

    let result: Vec<CommentResponse> = rows
        .into_iter()
        .map(|(c, u)| CommentResponse {
            id: c.id,
            content: c.content,
            user_id: c.user_id,
            user_name: u.name,
            entity_type: kind_of(&c.entity_type),
            entity_id: c.entity_id,
            created_at: c.created_at,
        })
        .collect();

    Json(result).into_response()
}

async fn create_internal(
    state: &Arc<AppState>,
    auth: AuthUser,
    kind: StatusKind,
    entity_id: String,
    payload: CreateComment,
) -> Response {
    if payload.content.is_empty() || payload.content.len() > 10000 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error(
                "Content must be 1-10000 characters",
            )),
        )
            .into_response();
    }

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

    match entity_exists(&mut conn, kind, &entity_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!(
                    "{} {} not found",
                    kind.as_str(),
                    entity_id
                ))),
            )
                .into_response()
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify entity")),
            )
                .into_response()
        }
    }

    let new_comment = NewComment {
        id: Uuid::new_v4().to_string(),
        content: payload.content,
        user_id: auth.user_id,
        entity_type: kind.as_str().to_string(),
        entity_id,
    };

    let created: Comment = match diesel::insert_into(comments::table)
        .values(&new_comment)
        .returning(Comment::as_returning())
        .get_result(&mut conn)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to create comment: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to create comment")),
            )
                .into_response();
        }
    };

    (
        StatusCode::CREATED,
        Json(CommentResponse {
            id: created.id,
            content: created.content,
            user_id: created.user_id,
            user_name: auth.name,
            entity_type: kind_of(&created.entity_type),
            entity_id: created.entity_id,
            created_at: created.created_at,
        }),
    )
        .into_response()
}

pub async fn list_for_demand(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    list_internal(&state, StatusKind::Demand, id).await
}

pub async fn list_for_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    list_internal(&state, StatusKind::Project, id).await
}

pub async fn create_for_demand(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthUser,
    Json(payload): Json<CreateComment>,
) -> impl IntoResponse {
    create_internal(&state, auth, StatusKind::Demand, id, payload).await
}

pub async fn create_for_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthUser,
    Json(payload): Json<CreateComment>,
) -> impl IntoResponse {
    create_internal(&state, auth, StatusKind::Project, id, payload).await
}

/// Comments can be removed by their author or an ADMIN.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthUser,
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

    let comment: Comment = match comments::table
        .filter(comments::id.eq(&id))
        .first(&mut conn)
        .await
    {
        Ok(c) => c,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Comment {} not found", id))),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch comment {id}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch comment")),
            )
                .into_response();
        }
    };

    if comment.user_id != auth.user_id && auth.role != Role::Admin {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiError::forbidden("Only the author or an ADMIN can delete a comment")),
        )
            .into_response();
    }

    match diesel::delete(comments::table.filter(comments::id.eq(&id)))
        .execute(&mut conn)
        .await
    {
        Ok(_) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(e) => {
            tracing::error!("Failed to delete comment {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to delete comment")),
            )
                .into_response()
        }
    }
}
