use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    TeamMember,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::TeamMember => "TEAM_MEMBER",
        }
    }

    pub fn all() -> &'static [Role] {
        &[Role::Admin, Role::Manager, Role::TeamMember]
    }
}

#[derive(Debug, Error)]
#[error("unknown role: '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "TEAM_MEMBER" => Ok(Role::TeamMember),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Planned,
    InProgress,
    Completed,
    OnHold,
}

impl AllocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Planned => "PLANNED",
            AllocationStatus::InProgress => "IN_PROGRESS",
            AllocationStatus::Completed => "COMPLETED",
            AllocationStatus::OnHold => "ON_HOLD",
        }
    }

    pub fn all() -> &'static [AllocationStatus] {
        &[
            AllocationStatus::Planned,
            AllocationStatus::InProgress,
            AllocationStatus::Completed,
            AllocationStatus::OnHold,
        ]
    }
}

/// Which workflow a status row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
    Demand,
    Project,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Demand => "DEMAND",
            StatusKind::Project => "PROJECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "Low",
            Complexity::Medium => "Medium",
            Complexity::High => "High",
        }
    }

    pub fn all() -> &'static [Complexity] {
        &[Complexity::Low, Complexity::Medium, Complexity::High]
    }
}

// ============================================================================
// Summaries embedded in other responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritySummary {
    pub id: String,
    pub name: String,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub id: String,
    pub name: String,
}

// ============================================================================
// API Request Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Dates travel as strings so the handlers can reject unparseable input with
/// a 400 and an error body instead of a framework-level deserialization error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllocation {
    pub user_id: String,
    pub project_id: String,
    pub demand_id: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub allocated_hours: f64,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAllocation {
    pub allocated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDemand {
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub priority_id: String,
    pub status_id: String,
    pub business_value: i32,
    pub complexity: String,
    pub estimated_effort: i32,
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDemand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub priority_id: Option<String>,
    pub status_id: Option<String>,
    pub business_value: Option<i32>,
    pub complexity: Option<String>,
    pub estimated_effort: Option<i32>,
    pub actual_effort: Option<i32>,
    pub due_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub status_id: String,
    pub priority_id: String,
    pub start_date: String,
    pub target_end_date: String,
    pub budget: f64,
    pub manager_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status_id: Option<String>,
    pub priority_id: Option<String>,
    pub start_date: Option<String>,
    pub target_end_date: Option<String>,
    pub actual_end_date: Option<String>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateComment {
    pub content: String,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub skills: Vec<String>,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub demand_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocated_hours: f64,
    pub actual_hours: Option<f64>,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
    pub project: ProjectSummary,
    pub demand: Option<DemandSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: CategorySummary,
    pub priority: PrioritySummary,
    pub status: StatusSummary,
    pub requested_by: UserSummary,
    pub requested_at: DateTime<Utc>,
    pub business_value: i32,
    pub complexity: String,
    pub estimated_effort: i32,
    pub actual_effort: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub related_project_id: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: StatusSummary,
    pub priority: PrioritySummary,
    pub manager: UserSummary,
    pub start_date: NaiveDate,
    pub target_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub budget: f64,
    pub spent: f64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub entity_type: StatusKind,
    pub entity_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityResponse {
    pub id: String,
    pub name: String,
    pub level: i32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub sort_order: i32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Resource overview
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAllocation {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    pub demand_id: Option<String>,
    pub demand_title: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocated_hours: f64,
    pub role: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberAvailability {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub capacity: i32,
    pub skills: Vec<String>,
    pub allocations: Vec<MemberAllocation>,
    pub total_allocated_hours: f64,
    pub availability: f64,
    pub utilization: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub team_members: i64,
    pub total_capacity: i64,
    pub total_allocated_hours: f64,
    pub avg_utilization: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOverviewResponse {
    pub members: Vec<TeamMemberAvailability>,
    pub summary: ResourceSummary,
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_demands: i64,
    pub total_projects: i64,
    pub demands_by_status: Vec<StatusCount>,
    pub projects_by_status: Vec<StatusCount>,
}

// ============================================================================
// Auth / plumbing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&Role::TeamMember).unwrap(), "\"TEAM_MEMBER\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"MANAGER\"").unwrap(),
            Role::Manager
        );
    }

    #[test]
    fn role_from_str_round_trips() {
        for role in Role::all() {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("SUPERUSER".parse::<Role>().is_err());
    }

    #[test]
    fn allocation_status_vocabulary() {
        let names: Vec<&str> = AllocationStatus::all().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["PLANNED", "IN_PROGRESS", "COMPLETED", "ON_HOLD"]);
    }

    #[test]
    fn create_allocation_uses_camel_case() {
        let payload: CreateAllocation = serde_json::from_str(
            r#"{"userId":"u1","projectId":"p1","startDate":"2024-01-01","endDate":"2024-01-31","allocatedHours":20}"#,
        )
        .unwrap();
        assert_eq!(payload.user_id, "u1");
        assert_eq!(payload.allocated_hours, 20.0);
        assert!(payload.demand_id.is_none());
        assert!(payload.role.is_none());
    }

    #[test]
    fn api_error_envelope_shape() {
        let err = ApiError::validation_error("allocatedHours must be >= 0");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "allocatedHours must be >= 0");
    }
}
