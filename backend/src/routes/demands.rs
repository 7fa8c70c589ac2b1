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
    ApiError, CategorySummary, Complexity, CreateDemand, DemandResponse, PrioritySummary,
    StatusKind, StatusSummary, UpdateDemand, UserSummary,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::schema::{categories, demands, priorities, projects, statuses, users};
use crate::models::{
    Category, Demand, NewDemand, NewProject, Priority, Project, Status, UpdateDemand as DemandChangeset,
    User,
};
use crate::AppState;

use super::{parse_date, require_manager, AuthUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandsQuery {
    pub status_id: Option<String>,
    pub category_id: Option<String>,
    pub priority_id: Option<String>,
    pub requested_by_id: Option<String>,
}

fn parse_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn to_response(
    (demand, category, priority, status, requester): (Demand, Category, Priority, Status, User),
) -> DemandResponse {
    DemandResponse {
        id: demand.id,
        title: demand.title,
        description: demand.description,
        category: CategorySummary {
            id: category.id,
            name: category.name,
        },
        priority: PrioritySummary {
            id: priority.id,
            name: priority.name,
            level: priority.level,
        },
        status: StatusSummary {
            id: status.id,
            name: status.name,
        },
        requested_by: UserSummary {
            id: requester.id,
            name: requester.name,
            email: requester.email,
        },
        requested_at: demand.requested_at,
        business_value: demand.business_value,
        complexity: demand.complexity,
        estimated_effort: demand.estimated_effort,
        actual_effort: demand.actual_effort,
        due_date: demand.due_date,
        related_project_id: demand.related_project_id,
        tags: parse_tags(&demand.tags),
        created_at: demand.created_at,
        updated_at: demand.updated_at,
    }
}

async fn fetch_response(
    conn: &mut AsyncPgConnection,
    id: &str,
) -> Result<Option<DemandResponse>, diesel::result::Error> {
    let row: Option<(Demand, Category, Priority, Status, User)> = demands::table
        .inner_join(categories::table.on(categories::id.eq(demands::category_id)))
        .inner_join(priorities::table.on(priorities::id.eq(demands::priority_id)))
        .inner_join(statuses::table.on(statuses::id.eq(demands::status_id)))
        .inner_join(users::table.on(users::id.eq(demands::requested_by_id)))
        .filter(demands::id.eq(id))
        .select((
            Demand::as_select(),
            Category::as_select(),
            Priority::as_select(),
            Status::as_select(),
            User::as_select(),
        ))
        .first(conn)
        .await
        .optional()?;

    Ok(row.map(to_response))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DemandsQuery>,
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

    let mut demands_query = demands::table
        .inner_join(categories::table.on(categories::id.eq(demands::category_id)))
        .inner_join(priorities::table.on(priorities::id.eq(demands::priority_id)))
        .inner_join(statuses::table.on(statuses::id.eq(demands::status_id)))
        .inner_join(users::table.on(users::id.eq(demands::requested_by_id)))
        .into_boxed();

    if let Some(ref status_id) = query.status_id {
        demands_query = demands_query.filter(demands::status_id.eq(status_id));
    }
    if let Some(ref category_id) = query.category_id {
        demands_query = demands_query.filter(demands::category_id.eq(category_id));
    }
    if let Some(ref priority_id) = query.priority_id {
        demands_query = demands_query.filter(demands::priority_id.eq(priority_id));
    }
    if let Some(ref requested_by_id) = query.requested_by_id {
        demands_query = demands_query.filter(demands::requested_by_id.eq(requested_by_id));
    }

    let rows: Vec<(Demand, Category, Priority, Status, User)> = match demands_query
        .order(demands::created_at.desc())
        .select((
            Demand::as_select(),
            Category::as_select(),
            Priority::as_select(),
            Status::as_select(),
            User::as_select(),
        ))
        .load(&mut conn)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch demands: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch demands")),
            )
                .into_response();
        }
    };

    let result: Vec<DemandResponse> = rows.into_iter().map(to_response).collect();
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
        Ok(Some(demand)) => Json(demand).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Demand {} not found", id))),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch demand {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch demand")),
            )
                .into_response()
        }
    }
}

fn is_valid_complexity(value: &str) -> bool {
    Complexity::all().iter().any(|c| c.as_str() == value)
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateDemand>,
) -> impl IntoResponse {
    if payload.title.is_empty() || payload.title.len() > 500 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("Title must be 1-500 characters")),
        )
            .into_response();
    }
    if !is_valid_complexity(&payload.complexity) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error(
                "Complexity must be one of: Low, Medium, High",
            )),
        )
            .into_response();
    }

    let due_date = match payload.due_date.as_deref() {
        Some(s) => match parse_date("dueDate", s) {
            Ok(d) => Some(d),
            Err(e) => return e.into_response(),
        },
        None => None,
    };

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

    // Verify the referenced reference-data rows
    let category_exists: bool = match categories::table
        .filter(categories::id.eq(&payload.category_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await
    {
        Ok(c) => c > 0,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify category")),
            )
                .into_response()
        }
    };
    if !category_exists {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("Invalid categoryId")),
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
    if status.kind != StatusKind::Demand.as_str() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("statusId is not a DEMAND status")),
        )
            .into_response();
    }

    let new_demand = NewDemand {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description,
        category_id: payload.category_id,
        priority_id: payload.priority_id,
        status_id: payload.status_id,
        requested_by_id: auth.user_id,
        requested_at: Utc::now(),
        business_value: payload.business_value,
        complexity: payload.complexity,
        estimated_effort: payload.estimated_effort,
        due_date,
        tags: serde_json::to_string(&payload.tags).unwrap_or_else(|_| "[]".to_string()),
    };

    let created: Demand = match diesel::insert_into(demands::table)
        .values(&new_demand)
        .returning(Demand::as_returning())
        .get_result(&mut conn)
        .await
    {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("Failed to create demand: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to create demand")),
            )
                .into_response();
        }
    };

    match fetch_response(&mut conn, &created.id).await {
        Ok(Some(demand)) => (StatusCode::CREATED, Json(demand)).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to load created demand")),
        )
            .into_response(),
    }
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    _auth: AuthUser,
    Json(payload): Json<UpdateDemand>,
) -> impl IntoResponse {
    if let Some(ref title) = payload.title {
        if title.is_empty() || title.len() > 500 {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation_error("Title must be 1-500 characters")),
            )
                .into_response();
        }
    }
    if let Some(ref complexity) = payload.complexity {
        if !is_valid_complexity(complexity) {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation_error(
                    "Complexity must be one of: Low, Medium, High",
                )),
            )
                .into_response();
        }
    }

    let due_date = match payload.due_date.as_deref() {
        Some(s) => match parse_date("dueDate", s) {
            Ok(d) => Some(d),
            Err(e) => return e.into_response(),
        },
        None => None,
    };

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

    let changeset = DemandChangeset {
        title: payload.title,
        description: payload.description,
        category_id: payload.category_id,
        priority_id: payload.priority_id,
        status_id: payload.status_id,
        business_value: payload.business_value,
        complexity: payload.complexity,
        estimated_effort: payload.estimated_effort,
        actual_effort: payload.actual_effort,
        due_date,
        related_project_id: None,
        tags: payload
            .tags
            .map(|t| serde_json::to_string(&t).unwrap_or_else(|_| "[]".to_string())),
        updated_at: Some(Utc::now()),
    };

    let updated: Demand = match diesel::update(demands::table.filter(demands::id.eq(&id)))
        .set(&changeset)
        .returning(Demand::as_returning())
        .get_result(&mut conn)
        .await
    {
        Ok(d) => d,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Demand {} not found", id))),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to update demand {id}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to update demand")),
            )
                .into_response();
        }
    };

    match fetch_response(&mut conn, &updated.id).await {
        Ok(Some(demand)) => Json(demand).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to load updated demand")),
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

    match diesel::delete(demands::table.filter(demands::id.eq(&id)))
        .execute(&mut conn)
        .await
    {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Demand {} not found", id))),
        )
            .into_response(),
        Ok(_) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(e) => {
            tracing::error!("Failed to delete demand {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to delete demand")),
            )
                .into_response()
        }
    }
}

/// Promote an approved demand into a project. The new project inherits the
/// demand's title, description, priority and tags; the session user becomes
/// its manager and the demand is linked back via `related_project_id`.
pub async fn convert(
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

    let demand: Demand = match demands::table
        .filter(demands::id.eq(&id))
        .first(&mut conn)
        .await
    {
        Ok(d) => d,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Demand {} not found", id))),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch demand {id}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch demand")),
            )
                .into_response();
        }
    };

    if let Some(ref project_id) = demand.related_project_id {
        return (
            StatusCode::CONFLICT,
            Json(ApiError::conflict(format!(
                "Demand {} was already converted to project {}",
                id, project_id
            ))),
        )
            .into_response();
    }

    // New projects start in the first PROJECT status of the workflow
    let initial_status: Status = match statuses::table
        .filter(statuses::kind.eq(StatusKind::Project.as_str()))
        .order(statuses::sort_order.asc())
        .first(&mut conn)
        .await
    {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("No project statuses configured: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("No project statuses configured")),
            )
                .into_response();
        }
    };

    let start_date = Utc::now().date_naive();
    // Without a due date on the demand, give the project a quarter by default
    let target_end_date = demand
        .due_date
        .unwrap_or_else(|| start_date + chrono::Duration::days(90));

    let new_project = NewProject {
        id: Uuid::new_v4().to_string(),
        name: demand.title.clone(),
        description: demand.description.clone(),
        status_id: initial_status.id,
        priority_id: demand.priority_id.clone(),
        start_date,
        target_end_date,
        budget: 0.0,
        spent: 0.0,
        manager_id: auth.user_id,
        tags: demand.tags.clone(),
    };

    let project: Project = match diesel::insert_into(projects::table)
        .values(&new_project)
        .returning(Project::as_returning())
        .get_result(&mut conn)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to create project from demand {id}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to create project")),
            )
                .into_response();
        }
    };

    if let Err(e) = diesel::update(demands::table.filter(demands::id.eq(&demand.id)))
        .set((
            demands::related_project_id.eq(&project.id),
            demands::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await
    {
        tracing::error!("Failed to link demand {id} to project {}: {e}", project.id);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to link demand to project")),
        )
            .into_response();
    }

    match super::projects::fetch_response(&mut conn, &project.id).await {
        Ok(Some(project)) => (StatusCode::CREATED, Json(project)).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to load created project")),
        )
            .into_response(),
    }
}
