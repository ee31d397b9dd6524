//! Регистрация, вход и профиль пользователя.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;
use tracing::info;
use validator::Validate;

use crate::database::Database;
use crate::models::User;
use crate::services::tokens::TokenService;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists with this email")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("token error")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("blocking task failed")]
    Join(#[from] task::JoinError),

    #[error("storage failure")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 2, max = 50, message = "First name must be between 2 and 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters"))]
    pub last_name: String,
    #[validate(length(min = 5, max = 32, message = "Please provide a valid phone number"))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "First name must be between 2 and 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters"))]
    pub last_name: Option<String>,
    #[validate(length(min = 5, max = 32, message = "Please provide a valid phone number"))]
    pub phone: Option<String>,
}

/// Пользователь вместе с выданным токеном.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct Accounts {
    db: Database,
    tokens: TokenService,
    hash_cost: u32,
}

impl Accounts {
    pub fn new(db: Database, tokens: TokenService) -> Self {
        Self { db, tokens, hash_cost: bcrypt::DEFAULT_COST }
    }

    /// Стоимость bcrypt; в тестах берут минимальную (4).
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthSession, AccountError> {
        let email = normalize_email(&req.email);

        if User::find_by_email(&email, &self.db).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let password_hash = hash_password(req.password, self.hash_cost).await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, first_name, last_name, phone)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *"
        )
        .bind(&email)
        .bind(password_hash)
        .bind(req.first_name.trim())
        .bind(req.last_name.trim())
        .bind(req.phone.as_deref())
        .fetch_one(&self.db.pool)
        .await
        .map_err(|e| match &e {
            // гонка двух регистраций с одним email
            sqlx::Error::Database(db) if db.is_unique_violation() => AccountError::EmailTaken,
            _ => AccountError::Database(e),
        })?;

        info!(user_id = user.id, "user registered");
        let token = self.tokens.issue(user.id)?;
        Ok(AuthSession { user, token })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthSession, AccountError> {
        let email = normalize_email(&req.email);

        let user = User::find_by_email(&email, &self.db)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(req.password, user.password_hash.clone()).await? {
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        Ok(AuthSession { user, token })
    }

    pub async fn profile(&self, user_id: i64) -> Result<User, AccountError> {
        User::find_by_id(user_id, &self.db)
            .await?
            .ok_or(AccountError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        req: UpdateProfileRequest,
    ) -> Result<User, AccountError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *"
        )
        .bind(user_id)
        .bind(req.first_name.as_deref().map(str::trim))
        .bind(req.last_name.as_deref().map(str::trim))
        .bind(req.phone.as_deref())
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or(AccountError::NotFound)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// bcrypt нагружает CPU, поэтому считается вне async-потоков
async fn hash_password(password: String, cost: u32) -> Result<String, AccountError> {
    let hash = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

async fn verify_password(password: String, hash: String) -> Result<bool, AccountError> {
    let ok = task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::{FreeEmail, Password};
    use fake::faker::name::en::{FirstName, LastName};
    use fake::Fake;

    fn fake_registration() -> RegisterRequest {
        RegisterRequest {
            email: FreeEmail().fake(),
            password: Password(8..16).fake(),
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            phone: None,
        }
    }

    #[test]
    fn generated_registration_passes_validation() {
        let req = fake_registration();
        assert!(req.validate().is_ok(), "{req:?}");
    }

    #[test]
    fn short_password_and_bad_email_are_rejected() {
        let mut req = fake_registration();
        req.email = "not-an-email".to_string();
        req.password = "123".to_string();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("correct horse".to_string(), 4).await.unwrap();
        assert!(verify_password("correct horse".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".to_string(), hash).await.unwrap());
    }
}
