pub mod validated;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Principal, User};
use crate::AppState;

pub use validated::{ValidJson, ValidPath, ValidQuery};

const NO_TOKEN: &str = "Access denied. No token provided.";
const INVALID_TOKEN: &str = "Invalid token.";
const ADMIN_ONLY: &str = "Access denied. Admin privileges required.";

/// Пользователь, предъявивший действующий bearer-токен.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        self.user.principal()
    }
}

/// Аутентифицированный администратор.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user: User,
}

// Извлекаем токен из "Authorization: Bearer <token>"
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve_user(state: &AppState, token: &str) -> Result<Option<User>, AppError> {
    let user_id = match state.tokens.verify(token) {
        Ok(id) => id,
        Err(e) => {
            debug!(error = %e, "rejected bearer token");
            return Ok(None);
        }
    };
    // токен мог пережить удалённого пользователя
    Ok(User::find_by_id(user_id, &state.db).await?)
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))?;

        let user = resolve_user(state, token)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_string()))?;

        Ok(AuthUser { user })
    }
}

// Для публичных маршрутов: без токена или с негодным токеном запрос анонимный
impl OptionalFromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(None);
        };
        Ok(resolve_user(state, token).await?.map(|user| AuthUser { user }))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser { user } = <AuthUser as FromRequestParts<Arc<AppState>>>::from_request_parts(parts, state)
            .await?;

        if !user.principal().is_admin() {
            return Err(AppError::Forbidden(ADMIN_ONLY.to_string()));
        }

        Ok(AdminUser { user })
    }
}
