//! Credential issuance: JWT pairs, one-time passcodes, password hashes.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;
use crate::tokens::TokenKind;

pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
pub const OTP_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub kind: TokenKind,
    /// Unique token id. Two refresh tokens minted in the same second
    /// must still differ, or rotation could reissue the same string.
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing/verification configuration for the two JWT families.
#[derive(Clone)]
pub struct AuthTokens {
    access_secret: String,
    refresh_secret: String,
    issuer: String,
    audience: String,
}

impl AuthTokens {
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation
    }

    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<String, EngineError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
        .map_err(|err| EngineError::Internal(format!("jwt: {err}")))
    }

    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String, EngineError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            kind: TokenKind::RefreshToken,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(REFRESH_TOKEN_TTL_SECS)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
        .map_err(|err| EngineError::Internal(format!("jwt: {err}")))
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, EngineError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &self.validation(),
        )
        .map(|data| data.claims)
        .map_err(|_| EngineError::Unauthorized("invalid access token".to_string()))
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, EngineError> {
        let claims = decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &self.validation(),
        )
        .map(|data| data.claims)
        .map_err(|_| EngineError::Unauthorized("invalid refresh token".to_string()))?;

        if claims.kind != TokenKind::RefreshToken {
            return Err(EngineError::Unauthorized("invalid token type".to_string()));
        }
        Ok(claims)
    }

    pub fn refresh_expiry() -> DateTime<Utc> {
        Utc::now() + Duration::seconds(REFRESH_TOKEN_TTL_SECS)
    }
}

/// A 6-digit zero-padded passcode.
pub fn generate_otp() -> String {
    let mut bytes = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut bytes);
    let number = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]) % 1_000_000;
    format!("{number:06}")
}

pub fn otp_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::seconds(OTP_TTL_SECS)
}

pub fn hash_password(password: &str) -> Result<String, EngineError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|err| EngineError::Internal(format!("bcrypt: {err}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, EngineError> {
    bcrypt::verify(password, hash).map_err(|err| EngineError::Internal(format!("bcrypt: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> AuthTokens {
        AuthTokens::new("access-secret", "refresh-secret", "moneta", "moneta-clients")
    }

    #[test]
    fn access_token_round_trips() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let token = keys.generate_access_token(user_id, "a@b.c").unwrap();
        let claims = keys.verify_access(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@b.c");
    }

    #[test]
    fn refresh_token_round_trips_and_carries_kind() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let token = keys.generate_refresh_token(user_id).unwrap();
        let claims = keys.verify_refresh(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.kind, TokenKind::RefreshToken);
    }

    #[test]
    fn refresh_tokens_are_unique_even_within_a_second() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let first = keys.generate_refresh_token(user_id).unwrap();
        let second = keys.generate_refresh_token(user_id).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn access_token_is_not_a_valid_refresh_token() {
        let keys = keys();
        let token = keys.generate_access_token(Uuid::new_v4(), "a@b.c").unwrap();
        assert!(keys.verify_refresh(&token).is_err());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let keys = keys();
        let other = AuthTokens::new("x", "y", "moneta", "moneta-clients");
        let token = other.generate_access_token(Uuid::new_v4(), "a@b.c").unwrap();
        assert_eq!(
            keys.verify_access(&token).unwrap_err(),
            EngineError::Unauthorized("invalid access token".to_string())
        );
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..32 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("hunter2!").unwrap();
        assert!(verify_password("hunter2!", &hash).unwrap());
        assert!(!verify_password("hunter3!", &hash).unwrap());
    }
}
