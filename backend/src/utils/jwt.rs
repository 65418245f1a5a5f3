//! JWT token utilities for authentication and authorization.
//!
//! Encodes and decodes signed claims with a single symmetric algorithm.
//! Expiry is not checked here; callers compare `exp` against an injected
//! clock.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::auth::permissions::Role;
use crate::errors::AuthError;

/// The only algorithm accepted on verification.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims structure carried by both token kinds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Numeric principal ID
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub token_type: TokenType,
    /// Unique token identifier, set on refresh tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Token expiration timestamp (seconds)
    pub exp: i64,
    /// Token issued at timestamp (seconds)
    pub iat: i64,
}

/// JWT token utility for signing and decoding claims
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtUtils {
    /// Create a new JwtUtils instance from the shared secret
    pub fn new(secret: &[u8]) -> Self {
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        JwtUtils {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Sign the claims
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenSigning(e.to_string()))
    }

    /// Check the signature and algorithm and return the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            })
    }
}

impl Claims {
    /// Whether the token is expired at `now` (seconds since epoch).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
