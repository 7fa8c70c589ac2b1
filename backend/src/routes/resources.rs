use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use shared::{
    capacity, ApiError, MemberAllocation, ResourceOverviewResponse, ResourceSummary, Role,
    TeamMemberAvailability,
};
use std::sync::Arc;

use crate::db::schema::{demands, projects, resource_allocations, users};
use crate::models::{Demand, Project, ResourceAllocation, User};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesQuery {
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Team availability overview: every member's allocations inside the window,
/// with utilization against weekly capacity. Allocations count their full
/// weekly hours toward any window they touch.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResourcesQuery>,
) -> impl IntoResponse {
    let from = match query.from.as_deref() {
        Some(s) => match super::parse_date("from", s) {
            Ok(d) => d,
            Err(e) => return e.into_response(),
        },
        // Without an explicit window, look at allocations still running today
        None => Utc::now().date_naive(),
    };
    let to = match query.to.as_deref() {
        Some(s) => match super::parse_date("to", s) {
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

    let mut members_query = users::table.order(users::name.asc()).into_boxed();
    if let Some(ref user_id) = query.user_id {
        members_query = members_query.filter(users::id.eq(user_id));
    }

    let members: Vec<User> = match members_query.load(&mut conn).await {
        Ok(u) => u,
        Err(e) => {
            tracing::error!("Failed to fetch team members: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to fetch team members")),
            )
                .into_response();
        }
    };

    let mut result: Vec<TeamMemberAvailability> = Vec::new();
    for member in &members {
        let mut allocations_query = resource_allocations::table
            .inner_join(projects::table.on(projects::id.eq(resource_allocations::project_id)))
            .left_join(
                demands::table.on(demands::id.nullable().eq(resource_allocations::demand_id)),
            )
            .filter(resource_allocations::user_id.eq(&member.id))
            .filter(resource_allocations::end_date.ge(from))
            .into_boxed();

        if let Some(to) = to {
            allocations_query = allocations_query.filter(resource_allocations::start_date.le(to));
        }
        if let Some(ref project_id) = query.project_id {
            allocations_query =
                allocations_query.filter(resource_allocations::project_id.eq(project_id));
        }

        let rows: Vec<(ResourceAllocation, Project, Option<Demand>)> = match allocations_query
            .order(resource_allocations::start_date.asc())
            .select((
                ResourceAllocation::as_select(),
                Project::as_select(),
                Option::<Demand>::as_select(),
            ))
            .load(&mut conn)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to fetch allocations for {}: {e}", member.id);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiError::internal_error("Failed to fetch allocations")),
                )
                    .into_response();
            }
        };

        let allocations: Vec<MemberAllocation> = rows
            .into_iter()
            .map(|(a, p, d)| MemberAllocation {
                id: a.id,
                project_id: a.project_id,
                project_name: p.name,
                demand_id: a.demand_id,
                demand_title: d.map(|d| d.title),
                start_date: a.start_date,
                end_date: a.end_date,
                allocated_hours: a.allocated_hours,
                role: a.role,
                status: a.status,
            })
            .collect();

        let total_allocated_hours: f64 = allocations.iter().map(|a| a.allocated_hours).sum();

        result.push(TeamMemberAvailability {
            id: member.id.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
            role: member.role.parse().unwrap_or(Role::TeamMember),
            capacity: member.capacity,
            skills: serde_json::from_str(&member.skills).unwrap_or_default(),
            allocations,
            total_allocated_hours,
            availability: capacity::availability(member.capacity, total_allocated_hours),
            utilization: capacity::utilization(member.capacity, total_allocated_hours),
        });
    }

    let total_capacity: i64 = result.iter().map(|m| m.capacity as i64).sum();
    let total_allocated_hours: f64 = result.iter().map(|m| m.total_allocated_hours).sum();
    let avg_utilization = if result.is_empty() {
        0
    } else {
        let sum: i64 = result.iter().map(|m| m.utilization as i64).sum();
        (sum as f64 / result.len() as f64).round() as i32
    };

    let summary = ResourceSummary {
        team_members: result.len() as i64,
        total_capacity,
        total_allocated_hours,
        avg_utilization,
    };

    Json(ResourceOverviewResponse {
        members: result,
        summary,
    })
    .into_response()
}
