use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{AppError, AppResult};
use crate::store::models::User;

/// Claims carried by the bearer credential. `is_admin` is intentionally
/// absent — every protected handler re-fetches it from the Store per
/// spec.md §4.8, never trusting a claim.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct Auth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    credential_expiry: Duration,
}

impl Auth {
    pub fn new(server_secret: &str, credential_expiry_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(server_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(server_secret.as_bytes()),
            credential_expiry: Duration::days(credential_expiry_days),
        }
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hash failed: {e}")))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            iat: now.unix_timestamp(),
            exp: (now + self.credential_expiry).unix_timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encode failed: {e}")))
    }

    /// Auth failures never distinguish "user missing" from "password wrong";
    /// both surface as `Unauthorized` to the caller, per spec.md §7.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }
}

/// Never logs the raw token, only a short fingerprint, per spec.md §9.
pub fn token_fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(token.as_bytes());
    hex_prefix(&digest, 8)
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    bytes
        .iter()
        .take(chars.div_ceil(2))
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let auth = Auth::new("test-secret", 7);
        let hash = auth.hash_password("correct horse battery staple").unwrap();
        assert!(auth.verify_password("correct horse battery staple", &hash));
        assert!(!auth.verify_password("wrong password", &hash));
    }

    #[test]
    fn token_roundtrip() {
        let auth = Auth::new("test-secret", 7);
        let user = User {
            id: 1,
            username: "alice".into(),
            password_hash: String::new(),
            is_admin: false,
            created_at: String::new(),
        };
        let token = auth.issue_token(&user).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn invalid_token_is_unauthorized() {
        let auth = Auth::new("test-secret", 7);
        let result = auth.verify_token("not-a-real-token");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
