use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use shared::{
    AllocationResponse, AllocationStatus, ApiError, CreateAllocation, DemandSummary,
    ProjectSummary, UpdateAllocation, UserSummary,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::schema::{demands, projects, resource_allocations, users};
use crate::models::{
    Demand, NewResourceAllocation, Project, ResourceAllocation, UpdateResourceAllocation, User,
};
use crate::AppState;

use super::{check_range, parse_date, require_manager, AuthUser, PayloadError};

pub const DEFAULT_ROLE: &str = "Contributor";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationsQuery {
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn to_response(
    (allocation, user, project, demand): (ResourceAllocation, User, Project, Option<Demand>),
) -> AllocationResponse {
    AllocationResponse {
        id: allocation.id,
        user_id: allocation.user_id,
        project_id: allocation.project_id,
        demand_id: allocation.demand_id,
        start_date: allocation.start_date,
        end_date: allocation.end_date,
        allocated_hours: allocation.allocated_hours,
        actual_hours: allocation.actual_hours,
        role: allocation.role,
        status: allocation.status,
        created_at: allocation.created_at,
        updated_at: allocation.updated_at,
        user: UserSummary {
            id: user.id,
            name: user.name,
            email: user.email,
        },
        project: ProjectSummary {
            id: project.id,
            name: project.name,
        },
        demand: demand.map(|d| DemandSummary {
            id: d.id,
            title: d.title,
        }),
    }
}

/// Load one allocation with its user/project/demand summaries.
async fn fetch_response(
    conn: &mut AsyncPgConnection,
    id: &str,
) -> Result<Option<AllocationResponse>, diesel::result::Error> {
    let row: Option<(ResourceAllocation, User, Project, Option<Demand>)> =
        resource_allocations::table
            .inner_join(users::table.on(users::id.eq(resource_allocations::user_id)))
            .inner_join(projects::table.on(projects::id.eq(resource_allocations::project_id)))
            .left_join(
                demands::table.on(demands::id.nullable().eq(resource_allocations::demand_id)),
            )
            .filter(resource_allocations::id.eq(id))
            .select((
                ResourceAllocation::as_select(),
                User::as_select(),
                Project::as_select(),
                Option::<Demand>::as_select(),
            ))
            .first(conn)
            .await
            .optional()?;

    Ok(row.map(to_response))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AllocationsQuery>,
) -> impl IntoResponse {
    let from = match query.from.as_deref() {
        Some(s) => match parse_date("from", s) {
            Ok(d) => Some(d),
            Err(e) => return e.into_response(),
        },
        None => None,
    };
    let to = match query.to.as_deref() {
        Some(s) => match parse_date("to", s) {
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

    let mut allocations_query = resource_allocations::table
        .inner_join(users::table.on(users::id.eq(resource_allocations::user_id)))
        .inner_join(projects::table.on(projects::id.eq(resource_allocations::project_id)))
        .left_join(demands::table.on(demands::id.nullable().eq(resource_allocations::demand_id)))
        .into_boxed();

    if let Some(ref user_id) = query.user_id {
        allocations_query = allocations_query.filter(resource_allocations::user_id.eq(user_id));
    }
    if let Some(ref project_id) = query.project_id {
        allocations_query =
            allocations_query.filter(resource_allocations::project_id.eq(project_id));
    }
    // Window filter: keep rows whose range touches [from, to]
    if let Some(from) = from {
        allocations_query = allocations_query.filter(resource_allocations::end_date.ge(from));
    }
    if let Some(to) = to {
        allocations_query = allocations_query.filter(resource_allocations::start_date.le(to));
    }

    let rows: Vec<(ResourceAllocation, User, Project, Option<Demand>)> = match allocations_query
        .order(resource_allocations::start_date.asc())
        .select((
            ResourceAllocation::as_select(),
            User::as_select(),
            Project::as_select(),
            Option::<Demand>::as_select(),
        ))
        .load(&mut conn)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch allocations: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch allocations")),
            )
                .into_response();
        }
    };

    let result: Vec<AllocationResponse> = rows.into_iter().map(to_response).collect();
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
        Ok(Some(allocation)) => Json(allocation).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Allocation {} not found", id))),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch allocation {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch allocation")),
            )
                .into_response()
        }
    }
}

fn validate_new(payload: &CreateAllocation) -> Result<(NaiveDate, NaiveDate), PayloadError> {
    if payload.allocated_hours < 0.0 {
        return Err(PayloadError::NegativeHours);
    }
    let start = parse_date("startDate", &payload.start_date)?;
    let end = parse_date("endDate", &payload.end_date)?;
    check_range(start, end)?;
    Ok((start, end))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    if let Err(resp) = require_manager(&auth) {
        return resp;
    }

    // Deserialize by hand so a missing field is a 400, not a framework 422.
    let payload: CreateAllocation = match serde_json::from_value(body) {
        Ok(p) => p,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation_error("Missing required fields")),
            )
                .into_response()
        }
    };

    let (start_date, end_date) = match validate_new(&payload) {
        Ok(dates) => dates,
        Err(e) => return e.into_response(),
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

    // Verify referenced rows before inserting
    let user_exists: bool = match users::table
        .filter(users::id.eq(&payload.user_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await
    {
        Ok(c) => c > 0,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify user")),
            )
                .into_response()
        }
    };
    if !user_exists {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error(format!(
                "Unknown userId '{}'",
                payload.user_id
            ))),
        )
            .into_response();
    }

    let project_exists: bool = match projects::table
        .filter(projects::id.eq(&payload.project_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await
    {
        Ok(c) => c > 0,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify project")),
            )
                .into_response()
        }
    };
    if !project_exists {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error(format!(
                "Unknown projectId '{}'",
                payload.project_id
            ))),
        )
            .into_response();
    }

    if let Some(ref demand_id) = payload.demand_id {
        let demand_exists: bool = match demands::table
            .filter(demands::id.eq(demand_id))
            .count()
            .get_result::<i64>(&mut conn)
            .await
        {
            Ok(c) => c > 0,
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiError::internal_error("Failed to verify demand")),
                )
                    .into_response()
            }
        };
        if !demand_exists {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation_error(format!(
                    "Unknown demandId '{}'",
                    demand_id
                ))),
            )
                .into_response();
        }
    }

    let new_allocation = NewResourceAllocation {
        id: Uuid::new_v4().to_string(),
        user_id: payload.user_id,
        project_id: payload.project_id,
        demand_id: payload.demand_id,
        start_date,
        end_date,
        allocated_hours: payload.allocated_hours,
        role: payload.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        status: AllocationStatus::Planned.as_str().to_string(),
    };

    let created: ResourceAllocation = match diesel::insert_into(resource_allocations::table)
        .values(&new_allocation)
        .returning(ResourceAllocation::as_returning())
        .get_result(&mut conn)
        .await
    {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Failed to create allocation: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to create allocation")),
            )
                .into_response();
        }
    };

    match fetch_response(&mut conn, &created.id).await {
        Ok(Some(allocation)) => (StatusCode::CREATED, Json(allocation)).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to load created allocation")),
        )
            .into_response(),
    }
}

fn validate_update(payload: &UpdateAllocation) -> Result<UpdateResourceAllocation, PayloadError> {
    if let Some(hours) = payload.allocated_hours {
        if hours < 0.0 {
            return Err(PayloadError::NegativeHours);
        }
    }

    if let Some(ref status) = payload.status {
        if !AllocationStatus::all().iter().any(|s| s.as_str() == status) {
            let valid: Vec<&str> = AllocationStatus::all().iter().map(|s| s.as_str()).collect();
            return Err(PayloadError::InvalidStatus(valid.join(", ")));
        }
    }

    let start_date = payload
        .start_date
        .as_deref()
        .map(|s| parse_date("startDate", s))
        .transpose()?;
    let end_date = payload
        .end_date
        .as_deref()
        .map(|s| parse_date("endDate", s))
        .transpose()?;

    // Only a request carrying both ends of the range can invert it; a
    // single-sided change is not cross-checked against the stored row.
    if let (Some(start), Some(end)) = (start_date, end_date) {
        check_range(start, end)?;
    }

    Ok(UpdateResourceAllocation {
        allocated_hours: payload.allocated_hours,
        actual_hours: payload.actual_hours,
        role: payload.role.clone(),
        status: payload.status.clone(),
        start_date,
        end_date,
        updated_at: Some(Utc::now()),
    })
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: AuthUser,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    if let Err(resp) = require_manager(&auth) {
        return resp;
    }

    let payload: UpdateAllocation = match serde_json::from_value(body) {
        Ok(p) => p,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation_error("Invalid request body")),
            )
                .into_response()
        }
    };

    let changeset = match validate_update(&payload) {
        Ok(c) => c,
        Err(e) => return e.into_response(),
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

    let updated: ResourceAllocation = match diesel::update(
        resource_allocations::table.filter(resource_allocations::id.eq(&id)),
    )
    .set(&changeset)
    .returning(ResourceAllocation::as_returning())
    .get_result(&mut conn)
    .await
    {
        Ok(a) => a,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Allocation {} not found", id))),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to update allocation {id}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to update allocation")),
            )
                .into_response();
        }
    };

    match fetch_response(&mut conn, &updated.id).await {
        Ok(Some(allocation)) => Json(allocation).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal_error("Failed to load updated allocation")),
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

    match diesel::delete(resource_allocations::table.filter(resource_allocations::id.eq(&id)))
        .execute(&mut conn)
        .await
    {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Allocation {} not found", id))),
        )
            .into_response(),
        Ok(_) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(e) => {
            tracing::error!("Failed to delete allocation {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to delete allocation")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> CreateAllocation {
        CreateAllocation {
            user_id: "u1".to_string(),
            project_id: "p1".to_string(),
            demand_id: None,
            start_date: "2024-01-01".to_string(),
            end_date: "2024-01-31".to_string(),
            allocated_hours: 20.0,
            role: None,
        }
    }

    #[test]
    fn accepts_a_valid_creation_payload() {
        let (start, end) = validate_new(&valid_payload()).unwrap();
        assert!(start <= end);
    }

    #[test]
    fn rejects_negative_hours() {
        let mut payload = valid_payload();
        payload.allocated_hours = -5.0;
        assert_eq!(validate_new(&payload), Err(PayloadError::NegativeHours));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut payload = valid_payload();
        payload.start_date = "2024-02-01".to_string();
        payload.end_date = "2024-01-01".to_string();
        assert_eq!(validate_new(&payload), Err(PayloadError::InvertedRange));
    }

    #[test]
    fn update_rejects_negative_hours() {
        let payload = UpdateAllocation {
            allocated_hours: Some(-5.0),
            ..Default::default()
        };
        assert_eq!(
            validate_update(&payload).unwrap_err(),
            PayloadError::NegativeHours
        );
    }

    #[test]
    fn update_rejects_unknown_status() {
        let payload = UpdateAllocation {
            status: Some("CANCELLED".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_update(&payload).unwrap_err(),
            PayloadError::InvalidStatus(_)
        ));
    }

    #[test]
    fn update_checks_range_only_when_both_dates_present() {
        // Single-sided change: no range check possible
        let one_sided = UpdateAllocation {
            start_date: Some("2024-06-01".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&one_sided).is_ok());

        let inverted = UpdateAllocation {
            start_date: Some("2024-06-01".to_string()),
            end_date: Some("2024-05-01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validate_update(&inverted).unwrap_err(),
            PayloadError::InvertedRange
        );
    }
}
