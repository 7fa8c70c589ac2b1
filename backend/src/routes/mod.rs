pub mod allocations;
pub mod auth;
pub mod catalog;
pub mod comments;
pub mod dashboard;
pub mod demands;
pub mod health;
pub mod projects;
pub mod resources;
pub mod users;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::{ApiError, Role};
use std::sync::Arc;

use crate::AppState;

const CLEAR_TOKEN_COOKIE: &str = "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // email
    pub name: String,
    pub user_id: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Dev mode bypass
        if state.config.dev_mode {
            return Ok(AuthUser {
                user_id: state
                    .config
                    .dev_user_id
                    .clone()
                    .unwrap_or_else(|| "dev".to_string()),
                email: "dev@localhost".to_string(),
                name: "Dev User".to_string(),
                role: Role::Admin,
            });
        }

        // Try to get token from cookie
        let cookie_header = parts
            .headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let token = cookie_header
            .split(';')
            .find_map(|cookie| {
                let cookie = cookie.trim();
                if cookie.starts_with("token=") {
                    Some(cookie.trim_start_matches("token="))
                } else {
                    None
                }
            })
            .or_else(|| {
                // Fallback to Authorization header
                parts
                    .headers
                    .get(axum::http::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
            });

        let token = match token {
            Some(t) => t,
            None => {
                return Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ApiError::unauthorized("Missing authentication token")),
                )
                    .into_response())
            }
        };

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                [(header::SET_COOKIE, CLEAR_TOKEN_COOKIE)],
                Json(ApiError::unauthorized("Invalid or expired token")),
            )
                .into_response()
        })?;

        Ok(AuthUser {
            user_id: token_data.claims.user_id,
            email: token_data.claims.sub,
            name: token_data.claims.name,
            role: token_data.claims.role,
        })
    }
}

/// Allocation and project mutations are restricted to ADMIN and MANAGER
/// sessions. TEAM_MEMBER sessions get a 403.
pub fn require_manager(auth: &AuthUser) -> Result<(), Response> {
    if matches!(auth.role, Role::Admin | Role::Manager) {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::forbidden("Requires ADMIN or MANAGER role")),
        )
            .into_response())
    }
}

// ============================================================================
// Payload validation
// ============================================================================

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid {field}: '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("startDate must be on or before endDate")]
    InvertedRange,
    #[error("allocatedHours must be >= 0")]
    NegativeHours,
    #[error("Invalid status. Must be one of: {0}")]
    InvalidStatus(String),
}

impl PayloadError {
    pub fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error(self.to_string())),
        )
            .into_response()
    }
}

/// Parse a date field from a request body. Accepts `YYYY-MM-DD` and, for
/// clients that send full timestamps, the date part of an RFC 3339 string.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, PayloadError> {
    let value = value.trim();
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }
    Err(PayloadError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

pub fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), PayloadError> {
    if start > end {
        Err(PayloadError::InvertedRange)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_iso_dates() {
        let d = parse_date("startDate", "2024-01-01").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let d = parse_date("endDate", "2024-01-31T12:30:00Z").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(
            parse_date("startDate", "next tuesday"),
            Err(PayloadError::InvalidDate {
                field: "startDate",
                value: "next tuesday".to_string()
            })
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(check_range(start, end), Err(PayloadError::InvertedRange));
        assert_eq!(check_range(end, start), Ok(()));
        // A single-day range is valid
        assert_eq!(check_range(start, start), Ok(()));
    }
}
