use super::model::{AuthenticatedUser, Role};
use crate::core::error::AppError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::Duration;

/// Validates HS256 bearer tokens issued by the identity provider
pub struct JwtValidator {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    #[serde(rename = "iss")]
    _iss: String,
    #[serde(rename = "exp")]
    _exp: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, issuer: String, audience: String, leeway: Duration) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let claims = token_data.claims;

        if claims.sub.trim().is_empty() {
            return Err(AppError::Auth("Token subject is empty".to_string()));
        }

        let role = claims.role.parse::<Role>().map_err(AppError::Auth)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const SECRET: &str = "test-secret";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        role: &'a str,
        iss: &'a str,
        aud: &'a str,
        exp: u64,
    }

    fn token(sub: &str, role: &str, aud: &str) -> String {
        let exp = (chrono::Utc::now().timestamp() + 3600) as u64;
        encode(
            &Header::new(Algorithm::HS256),
            &TestClaims {
                sub,
                role,
                iss: "ermn",
                aud,
                exp,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn validator() -> JwtValidator {
        JwtValidator::new(
            SECRET,
            "ermn".to_string(),
            "dispatch".to_string(),
            Duration::from_secs(0),
        )
    }

    #[test]
    fn test_valid_token_resolves_identity() {
        let user = validator()
            .validate_token(&token("driver-7", "driver", "dispatch"))
            .unwrap();
        assert_eq!(user, AuthenticatedUser::new("driver-7", Role::Driver));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = validator()
            .validate_token(&token("u", "janitor", "dispatch"))
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let err = validator()
            .validate_token(&token("u", "citizen", "elsewhere"))
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
