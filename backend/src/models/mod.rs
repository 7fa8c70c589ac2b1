use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::db::schema::*;

// ============================================================================
// User
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub skills: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Priority
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = priorities)]
pub struct Priority {
    pub id: String,
    pub name: String,
    pub level: i32,
    pub color: String,
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = statuses)]
pub struct Status {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub sort_order: i32,
    pub color: String,
}

// ============================================================================
// Category
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Demand
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = demands)]
pub struct Demand {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub priority_id: String,
    pub status_id: String,
    pub requested_by_id: String,
    pub requested_at: DateTime<Utc>,
    pub business_value: i32,
    pub complexity: String,
    pub estimated_effort: i32,
    pub actual_effort: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub related_project_id: Option<String>,
    pub tags: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = demands)]
pub struct NewDemand {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub priority_id: String,
    pub status_id: String,
    pub requested_by_id: String,
    pub requested_at: DateTime<Utc>,
    pub business_value: i32,
    pub complexity: String,
    pub estimated_effort: i32,
    pub due_date: Option<NaiveDate>,
    pub tags: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = demands)]
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
    pub due_date: Option<NaiveDate>,
    pub related_project_id: Option<String>,
    pub tags: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Project
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status_id: String,
    pub priority_id: String,
    pub start_date: NaiveDate,
    pub target_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub budget: f64,
    pub spent: f64,
    pub manager_id: String,
    pub tags: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status_id: String,
    pub priority_id: String,
    pub start_date: NaiveDate,
    pub target_end_date: NaiveDate,
    pub budget: f64,
    pub spent: f64,
    pub manager_id: String,
    pub tags: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = projects)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status_id: Option<String>,
    pub priority_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub tags: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// ResourceAllocation
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = resource_allocations)]
pub struct ResourceAllocation {
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
}

#[derive(Debug, Insertable)]
#[diesel(table_name = resource_allocations)]
pub struct NewResourceAllocation {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub demand_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocated_hours: f64,
    pub role: String,
    pub status: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = resource_allocations)]
pub struct UpdateResourceAllocation {
    pub allocated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Comment
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub entity_type: String,
    pub entity_id: String,
}
