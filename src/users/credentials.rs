use super::models::User;
use crate::config::JwtSettings;
use crate::types::{invalid_argument, unauthorized, Error, ErrorKind, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_LENGTH: usize = 72;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Password hashing and bearer token signing, keyed by one shared secret.
#[derive(Clone)]
pub struct Credentials {
    settings: JwtSettings,
    bcrypt_cost: u32,
    validation: Validation,
}

impl Credentials {
    pub fn new(settings: JwtSettings, bcrypt_cost: u32) -> Credentials {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;
        Credentials {
            settings,
            bcrypt_cost,
            validation,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(invalid_argument(format!(
                "Password length must be less than or equal to {}",
                MAX_PASSWORD_LENGTH
            )));
        }
        bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|e| credential_failure("hashing password", e))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        // Never stored, so it can't match; bcrypt would otherwise compare a prefix.
        if password.len() > MAX_PASSWORD_LENGTH {
            return Ok(false);
        }
        bcrypt::verify(password, hash).map_err(|e| credential_failure("verifying password", e))
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            iss: self.settings.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.settings.valid_for_seconds)).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| credential_failure("signing token", e))
    }

    /// Returns the user id the token was issued for.
    pub fn validate_token(&self, token: &str) -> Result<i32> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &self.validation,
        )
        .map_err(|e| {
            debug!(reason = ?e.kind(), "rejected token");
            unauthorized("Invalid token")
        })?;
        data.claims
            .sub
            .parse::<i32>()
            .map_err(|_| unauthorized("Invalid token"))
    }
}

fn credential_failure<E>(action: &str, err: E) -> Error
where
    E: std::error::Error + Send + 'static,
{
    error!(error = %err, action, "credential failure");
    Error::with_chain(err, ErrorKind::Credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn settings(valid_for_seconds: i64) -> JwtSettings {
        JwtSettings {
            secret: "secret-key".into(),
            issuer: "conduit".into(),
            valid_for_seconds,
        }
    }

    fn user(id: i32) -> User {
        let now = Utc::now().naive_utc();
        User {
            id,
            email: "jake@jake.jake".into(),
            username: "jake".into(),
            password_hash: String::new(),
            bio: None,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn is_unauthorized(err: &crate::types::Error) -> bool {
        matches!(err.kind(), ErrorKind::Unauthorized(_))
    }

    #[test]
    fn hashes_and_verifies() {
        let credentials = Credentials::new(settings(60), 4);
        let hash = credentials.hash_password("jakejake").unwrap();
        assert_ne!(hash, "jakejake");
        assert!(credentials.verify_password("jakejake", &hash).unwrap());
        assert!(!credentials.verify_password("jakejakf", &hash).unwrap());
    }

    #[test]
    fn rejects_overlong_password() {
        let credentials = Credentials::new(settings(60), 4);
        let long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        let err = credentials.hash_password(&long).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));
        assert!(credentials
            .hash_password(&"a".repeat(MAX_PASSWORD_LENGTH))
            .is_ok());
    }

    #[test]
    fn token_round_trips_subject() {
        let credentials = Credentials::new(settings(60), 4);
        let token = credentials.issue_token(&user(42)).unwrap();
        assert_eq!(credentials.validate_token(&token).unwrap(), 42);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let credentials = Credentials::new(settings(-60), 4);
        let token = credentials.issue_token(&user(1)).unwrap();
        assert!(is_unauthorized(&credentials.validate_token(&token).unwrap_err()));
    }

    #[test]
    fn foreign_issuer_or_secret_is_unauthorized() {
        let ours = Credentials::new(settings(60), 4);
        let other_issuer = Credentials::new(
            JwtSettings {
                issuer: "elsewhere".into(),
                ..settings(60)
            },
            4,
        );
        let other_secret = Credentials::new(
            JwtSettings {
                secret: "another-key".into(),
                ..settings(60)
            },
            4,
        );
        let token = ours.issue_token(&user(1)).unwrap();
        assert!(is_unauthorized(&other_issuer.validate_token(&token).unwrap_err()));
        assert!(is_unauthorized(&other_secret.validate_token(&token).unwrap_err()));
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let credentials = Credentials::new(settings(60), 4);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".into(),
            iss: "conduit".into(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"secret-key"),
        )
        .unwrap();
        assert!(is_unauthorized(&credentials.validate_token(&token).unwrap_err()));
    }

    #[test]
    fn garbage_is_unauthorized() {
        let credentials = Credentials::new(settings(60), 4);
        assert!(is_unauthorized(&credentials.validate_token("not.a.token").unwrap_err()));
        assert!(is_unauthorized(&credentials.validate_token("").unwrap_err()));
    }

    #[test]
    #[traced_test]
    fn hashing_failures_are_internal_and_logged() {
        // bcrypt refuses costs below 4.
        let credentials = Credentials::new(settings(60), 3);
        let err = credentials.hash_password("jakejake").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Credentials));
        assert!(err.is_internal());
        assert!(logs_contain("hashing password"));

        let sound = Credentials::new(settings(60), 4);
        let err = sound.verify_password("jakejake", "not-a-hash").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Credentials));
        assert!(logs_contain("verifying password"));
    }

    #[derive(Serialize)]
    struct PartialClaims {
        #[serde(skip_serializing_if = "Option::is_none")]
        sub: Option<String>,
        iss: String,
        iat: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        exp: Option<i64>,
    }

    fn sign(claims: &PartialClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(b"secret-key"),
        )
        .unwrap()
    }

    #[test]
    fn tokens_missing_required_claims_are_unauthorized() {
        let credentials = Credentials::new(settings(60), 4);
        let now = Utc::now().timestamp();
        let no_subject = sign(&PartialClaims {
            sub: None,
            iss: "conduit".into(),
            iat: now,
            exp: Some(now + 60),
        });
        let no_expiry = sign(&PartialClaims {
            sub: Some("1".into()),
            iss: "conduit".into(),
            iat: now,
            exp: None,
        });
        assert!(is_unauthorized(&credentials.validate_token(&no_subject).unwrap_err()));
        assert!(is_unauthorized(&credentials.validate_token(&no_expiry).unwrap_err()));

        let complete = sign(&PartialClaims {
            sub: Some("1".into()),
            iss: "conduit".into(),
            iat: now,
            exp: Some(now + 60),
        });
        assert_eq!(credentials.validate_token(&complete).unwrap(), 1);
    }
}
