use argon2::password_hash::PasswordHash;
use argon2::{Argon2, PasswordVerifier};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use jsonwebtoken::{encode, EncodingKey, Header};
use shared::{ApiError, CurrentUserResponse, LoginRequest, Role};
use std::sync::Arc;

use crate::db::schema::users;
use crate::models::User;
use crate::AppState;

use super::{AuthUser, Claims};

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    if payload.email.is_empty() || payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation_error("Email and password are required")),
        )
            .into_response();
    }

    let mut conn = match state.pool.get().await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to get database connection: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Database connection failed")),
            )
                .into_response();
        }
    };

    let user: User = match users::table
        .filter(users::email.eq(&payload.email))
        .first(&mut conn)
        .await
    {
        Ok(u) => u,
        Err(diesel::NotFound) => {
            // Same response as a bad password so the endpoint doesn't
            // confirm which emails exist.
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::unauthorized("Invalid email or password")),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Login query failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to look up user")),
            )
                .into_response();
        }
    };

    let hash = match PasswordHash::new(&user.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Stored password hash for {} is malformed: {e}", user.id);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to verify credentials")),
            )
                .into_response();
        }
    };

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &hash)
        .is_err()
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::unauthorized("Invalid email or password")),
        )
            .into_response();
    }

    let role: Role = match user.role.parse() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("User {} has an unknown role: {e}", user.id);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to resolve user role")),
            )
                .into_response();
        }
    };

    let token = create_jwt(&state.config.jwt_secret, &user, role);
    let cookie = format!(
        "token={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400",
        token
    );

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(CurrentUserResponse {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role,
        }),
    )
        .into_response()
}

pub async fn logout() -> Response {
    let cookie = "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(shared::LogoutResponse {
            status: "logged out".to_string(),
        }),
    )
        .into_response()
}

pub async fn me(auth_user: AuthUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user_id: auth_user.user_id,
        email: auth_user.email,
        name: auth_user.name,
        role: auth_user.role,
    })
}

fn create_jwt(secret: &str, user: &User, role: Role) -> String {
    let now = Utc::now();
    let exp = now + Duration::hours(24);

    let claims = Claims {
        sub: user.email.clone(),
        name: user.name.clone(),
        user_id: user.id.clone(),
        role,
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to create JWT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            name: "Admin User".to_string(),
            email: "admin@demandit.com".to_string(),
            password: String::new(),
            role: "ADMIN".to_string(),
            skills: "[]".to_string(),
            capacity: 40,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn jwt_round_trips_identity_and_role() {
        let token = create_jwt("test-secret", &sample_user(), Role::Manager);
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "admin@demandit.com");
        assert_eq!(data.claims.user_id, "u1");
        assert_eq!(data.claims.role, Role::Manager);
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let token = create_jwt("test-secret", &sample_user(), Role::Admin);
        assert!(decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        )
        .is_err());
    }
}
