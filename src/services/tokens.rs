use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{JwtConfig, MAX_TOKEN_LIFETIME_HOURS};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    iat: i64,
    exp: i64,
}

/// Выпуск и проверка bearer-токенов (HS256).
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            // JwtConfig можно собрать и в обход from_env
            lifetime: Duration::hours(
                config
                    .expires_in_hours
                    .clamp(-MAX_TOKEN_LIFETIME_HOURS, MAX_TOKEN_LIFETIME_HOURS),
            ),
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Возвращает id пользователя из действующего токена.
    pub fn verify(&self, token: &str) -> Result<i64, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, hours: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: secret.to_string(),
            expires_in_hours: hours,
        })
    }

    #[test]
    fn issued_token_verifies_to_same_user() {
        let tokens = service("s3cret", 24);
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), 42);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = service("one", 24).issue(42).unwrap();
        assert!(service("two", 24).verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // за пределами допуска leeway по умолчанию (60 секунд)
        let tokens = service("s3cret", -1);
        let token = tokens.issue(42).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn oversized_lifetime_is_capped() {
        let tokens = service("s3cret", i64::MAX);
        let token = tokens.issue(7).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), 7);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service("s3cret", 24).verify("not-a-jwt").is_err());
    }
}
