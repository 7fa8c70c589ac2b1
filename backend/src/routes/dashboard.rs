use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel_async::RunQueryDsl;
use shared::{ApiError, DashboardStats, StatusCount};
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, QueryableByName)]
struct RawStatsRow {
    #[diesel(sql_type = BigInt)]
    total_users: i64,
    #[diesel(sql_type = BigInt)]
    total_demands: i64,
    #[diesel(sql_type = BigInt)]
    total_projects: i64,
    #[diesel(sql_type = Nullable<Text>)]
    demand_stats: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    project_stats: Option<String>,
}

/// `json_agg` returns NULL for an empty aggregation; statuses that exist but
/// have no rows still appear with a count of 0 thanks to the LEFT JOIN.
fn parse_status_counts(raw: Option<&str>) -> Vec<StatusCount> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
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

    let sql = r#"
        WITH demand_stats AS (
            SELECT
                s.name AS status,
                s.sort_order,
                COUNT(d.id) AS count
            FROM statuses s
            LEFT JOIN demands d ON s.id = d.status_id
            WHERE s.type = 'DEMAND'
            GROUP BY s.name, s.sort_order
        ),
        project_stats AS (
            SELECT
                s.name AS status,
                s.sort_order,
                COUNT(p.id) AS count
            FROM statuses s
            LEFT JOIN projects p ON s.id = p.status_id
            WHERE s.type = 'PROJECT'
            GROUP BY s.name, s.sort_order
        )
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM demands) AS total_demands,
            (SELECT COUNT(*) FROM projects) AS total_projects,
            (
                SELECT json_agg(
                    json_build_object('status', status, 'count', count)
                    ORDER BY sort_order
                )::text
                FROM demand_stats
            ) AS demand_stats,
            (
                SELECT json_agg(
                    json_build_object('status', status, 'count', count)
                    ORDER BY sort_order
                )::text
                FROM project_stats
            ) AS project_stats
    "#;

    let row: RawStatsRow = match diesel::sql_query(sql).get_result(&mut conn).await {
        Ok(row) => row,
        Err(e) => {
            tracing::error!("Dashboard stats query failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to load dashboard stats")),
            )
                .into_response();
        }
    };

    Json(DashboardStats {
        total_users: row.total_users,
        total_demands: row.total_demands,
        total_projects: row.total_projects,
        demands_by_status: parse_status_counts(row.demand_stats.as_deref()),
        projects_by_status: parse_status_counts(row.project_stats.as_deref()),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aggregated_status_counts() {
        let raw = r#"[{"status":"New","count":3},{"status":"Approved","count":0}]"#;
        let counts = parse_status_counts(Some(raw));
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].status, "New");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[1].count, 0);
    }

    #[test]
    fn empty_aggregation_is_an_empty_list() {
        assert!(parse_status_counts(None).is_empty());
        assert!(parse_status_counts(Some("not json")).is_empty());
    }
}
