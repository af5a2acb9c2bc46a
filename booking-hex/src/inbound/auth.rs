//! Session authentication middleware for customer and admin routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use booking_types::{AppError, BookingRepository, User};

use super::handlers::{ApiError, AppState};

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "session_token";

/// The signed-in user, injected into request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extracts the session token from the Authorization header.
/// Expected format: "Bearer <token>" or just "<token>"
/// An empty value yields `None` so the session cookie can be tried instead.
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?.trim_start();
    let token = match header.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest,
        _ => header,
    }
    .trim();
    (!token.is_empty()).then_some(token)
}

/// Extracts the session token from a `Cookie` header.
fn extract_cookie(cookie_header: Option<&str>) -> Option<&str> {
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Authentication middleware that resolves session tokens.
///
/// This middleware:
/// 1. Takes the token from `Authorization: Bearer` or the session cookie
/// 2. Hashes it using SHA-256
/// 3. Looks up an unexpired session and its user
/// 4. Inserts `CurrentUser` into the request, or returns 401 Unauthorized
///
/// It is only layered on protected routes, so the body of an unauthenticated
/// request is never read.
pub async fn auth_middleware<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let headers = request.headers();
    let token = extract_bearer(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    )
    .or_else(|| extract_cookie(headers.get(header::COOKIE).and_then(|v| v.to_str().ok())))
    .map(str::to_owned);

    let Some(token) = token else {
        return unauthorized();
    };

    let token_hash = booking_repo::security::hash_session_token(&token);

    match state.service.repo().find_session_user(&token_hash).await {
        Ok(Some(user)) => {
            tracing::debug!(user_id = %user.id, role = %user.role, "session resolved");
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(None) => unauthorized(),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            ApiError(AppError::Internal("Internal server error".into())).into_response()
        }
    }
}

/// Admin routes additionally require the ADMIN role.
pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Forbidden".into()))
    }
}

fn unauthorized() -> Response {
    ApiError(AppError::Unauthorized("Unauthorized".into())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_types::Role;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer sess_123")), Some("sess_123"));
        assert_eq!(extract_bearer(Some("sess_123")), Some("sess_123"));
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("Bearer")), None);
        assert_eq!(extract_bearer(Some("  Bearer   sess_123  ")), Some("sess_123"));
        assert_eq!(extract_bearer(Some("Bearersess_123")), Some("Bearersess_123"));
        assert_eq!(extract_bearer(None), None);
    }

    #[test]
    fn test_extract_cookie() {
        assert_eq!(
            extract_cookie(Some("theme=dark; session_token=sess_abc; lang=ja")),
            Some("sess_abc")
        );
        assert_eq!(extract_cookie(Some("theme=dark")), None);
        assert_eq!(extract_cookie(Some("session_token=")), None);
    }

    #[test]
    fn test_require_admin() {
        let customer = User::new("u1", None, "u1@example.com");
        assert!(matches!(
            require_admin(&customer),
            Err(AppError::Forbidden(_))
        ));
        assert!(require_admin(&customer.with_role(Role::Admin)).is_ok());
    }
}
