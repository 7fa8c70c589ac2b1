use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use shared::{
    ApiError, CreateProject, PrioritySummary, ProjectResponse, StatusKind, StatusSummary,
    UpdateProject, UserSummary,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::schema::{priorities, projects, statuses, users};
use crate::models::{
    NewProject, Priority, Project, Status, UpdateProject as ProjectChangeset, User,
};
use crate::AppState;

use super::{check_range, parse_date, require_manager, AuthUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsQuery {
    pub status_id: Option<String>,
    pub manager_id: Option<String>,
}

fn to_response(
    (project, status, priority, manager): (Project, Status, Priority, User),
) -> ProjectResponse {
    ProjectResponse {
        id: project.id,
        name: project.name,
        description: project.description,
        status: StatusSummary {
            id: status.id,
            name: status.name,
        },
        priority: PrioritySummary {
            id: priority.id,
            name: priority.name,
            level: priority.level,
        },
        manager: UserSummary {
            id: manager.id,
            name: manager.name,
            email: manager.email,
        },
        start_date: project.start_date,
        target_end_date: project.target_end_date,
        actual_end_date: project.actual_end_date,
        budget: project.budget,
        spent: project.spent,
        tags: serde_json::from_str(&project.tags).unwrap_or_default(),
        created_at: project.created_at,
        updated_at: project.updated_at,
    }
}

pub(super) async fn fetch_response(
    conn: &mut AsyncPgConnection,
    id: &str,
) -> Result<Option<ProjectResponse>, diesel::result::Error> {
    let row: Option<(Project, Status, Priority, User)> = projects::table
        .inner_join(statuses::table.on(statuses::id.eq(projects::status_id)))
        .inner_join(priorities::table.on(priorities::id.eq(projects::priority_id)))
        .inner_join(users::table.on(users::id.eq(projects::manager_id)))
        .filter(projects::id.eq(id))
        .select((
            Project::as_select(),
            Status::as_select(),
            Priority::as_select(),
            User::as_select(),
        ))
        .first(conn)
        .await
        .optional()?;

    Ok(row.map(to_response))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectsQuery>,
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

    let mut projects_query = projects::table
        .inner_join(statuses::table.on(statuses::id.eq(projects::status_id)))
        .inner_join(priorities::table.on(priorities::id.eq(projects::priority_id)))
        .inner_join(users::table.on(users::id.eq(projects::manager_id)))
        .into_boxed();

    if let Some(ref status_id) = query.status_id {
        projects_query = projects_query.filter(projects::status_id.eq(status_id));
    }
    if let Some(ref manager_id) = query.manager_id {
        projects_query = projects_query.filter(projects::manager_id.eq(manager_id));
    }

    let rows: Vec<(Project, Status, Priority, User)> = match projects_query
        .order(projects::created_at.desc())
        .select((
            Project::as_select(),
            Status::as_select(),
            Priority::as_select(),
            User::as_select(),
        ))
        .load(&mut conn)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch projects: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch projects")),
            )
                .into_response();
        }
    };

    let result: Vec<ProjectResponse> = rows.into_iter().map(to_response).collect();
    Json(result).into_response()
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
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

    match fetch_response(&mut conn, &id).await {
        Ok(Some(project)) => Json(project).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Project {} not found", id))),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch project {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch project")),
            )
                .into_response()
        }
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateProject>,
) -> impl IntoResponse {
    if let Err(resp) = require_manager(&auth) {
        return resp;
    }

    if payload.name.is_empty() || payload.name.len() > 255 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("Name must be 1-255 characters")),
        )
            .into_response();
    }
    if payload.budget < 0.0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("budget must be >= 0")),
        )
            .into_response();
    }

    let start_date = match parse_date("startDate", &payload.start_date) {
        Ok(d) => d,
        Err(e) => return e.into_response(),
    };
    let target_end_date = match parse_date("targetEndDate", &payload.target_end_date) {
        Ok(d) => d,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = check_range(start_date, target_end_date) {
        return e.into_response();
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

    let status: Status = match statuses::table
        .filter(statuses::id.eq(&payload.status_id))
        .first(&mut conn)
        .await
    {
        Ok(s) => s,
        Err(diesel::NotFound) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation_error("Invalid statusId")),
            )
                .into_response()
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify status")),
            )
                .into_response()
        }
    };
    if status.kind != StatusKind::Project.as_str() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error(
                "statusId is not a PROJECT status",
            )),
        )
            .into_response();
    }

    let priority_exists: bool = match priorities::table
        .filter(priorities::id.eq(&payload.priority_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await
    {
        Ok(c) => c > 0,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify priority")),
            )
                .into_response()
        }
    };
    if !priority_exists {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("Invalid priorityId")),
        )
            .into_response();
    }

    let manager_id = payload.manager_id.unwrap_or_else(|| auth.user_id.clone());
    let manager_exists: bool = match users::table
        .filter(users::id.eq(&manager_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await
    {
        Ok(c) => c > 0,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify manager")),
            )
                .into_response()
        }
    };
    if !manager_exists {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error(format!(
                "Unknown managerId '{}'",
                manager_id
            ))),
        )
            .into_response();
    }

    let new_project = NewProject {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        description: payload.description,
        status_id: payload.status_id,
        priority_id: payload.priority_id,
        start_date,
        target_end_date,
        budget: payload.budget,
        spent: 0.0,
        manager_id,
        tags: serde_json::to_string(&payload.tags).unwrap_or_else(|_| "[]".to_string()),
    };

    let created: Project = match diesel::insert_into(projects::table)
        .values(&new_project)
        .returning(Project::as_returning())
        .get_result(&mut conn)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to create project: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to create project")),
            )
                .into_response();
        }
    };

    match fetch_response(&mut conn, &created.id).await {
        Ok(Some(project)) => (StatusCode::CREATED, Json(project)).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to load created project")),
        )
            .into_response(),
    }
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthUser,
    Json(payload): Json<UpdateProject>,
) -> impl IntoResponse {
    if let Err(resp) = require_manager(&auth) {
        return resp;
    }

    if let Some(ref name) = payload.name {
        if name.is_empty() || name.len() > 255 {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation_error("Name must be 1-255 characters")),
            )
                .into_response();
        }
    }
    if matches!(payload.budget, Some(b) if b < 0.0) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("budget must be >= 0")),
        )
            .into_response();
    }

    let start_date = match payload.start_date.as_deref() {
        Some(s) => match parse_date("startDate", s) {
            Ok(d) => Some(d),
            Err(e) => return e.into_response(),
        },
        None => None,
    };
    let target_end_date = match payload.target_end_date.as_deref() {
        Some(s) => match parse_date("targetEndDate", s) {
            Ok(d) => Some(d),
            Err(e) => return e.into_response(),
        },
        None => None,
    };
    let actual_end_date = match payload.actual_end_date.as_deref() {
        Some(s) => match parse_date("actualEndDate", s) {
            Ok(d) => Some(d),
            Err(e) => return e.into_response(),
        },
        None => None,
    };
    if let (Some(start), Some(end)) = (start_date, target_end_date) {
        if let Err(e) = check_range(start, end) {
            return e.into_response();
        }
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

    let changeset = ProjectChangeset {
        name: payload.name,
        description: payload.description,
        status_id: payload.status_id,
        priority_id: payload.priority_id,
        start_date,
        target_end_date,
        actual_end_date,
        budget: payload.budget,
        spent: payload.spent,
        tags: payload
            .tags
            .map(|t| serde_json::to_string(&t).unwrap_or_else(|_| "[]".to_string())),
        updated_at: Some(Utc::now()),
    };

    let updated: Project = match diesel::update(projects::table.filter(projects::id.eq(&id)))
        .set(&changeset)
        .returning(Project::as_returning())
        .get_result(&mut conn)
        .await
    {
        Ok(p) => p,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Project {} not found", id))),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to update project {id}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to update project")),
            )
                .into_response();
        }
    };

    match fetch_response(&mut conn, &updated.id).await {
        Ok(Some(project)) => Json(project).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to load updated project")),
        )
            .into_response(),
    }
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthUser,
) -> impl IntoResponse {
    if let Err(resp) = require_manager(&auth) {
        return resp;
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

    match diesel::delete(projects::table.filter(projects::id.eq(&id)))
        .execute(&mut conn)
        .await
    {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Project {} not found", id))),
        )
            .into_response(),
        Ok(_) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(e) => {
            tracing::error!("Failed to delete project {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to delete project")),
            )
                .into_response()
        }
    }
}
