//! Access-token codec: HS256 JWT encoding and validation.
//!
//! Access tokens are self-contained: the subject (username), the numeric user
//! id and a snapshot of the user's role names are embedded as claims and
//! signed with a symmetric key. The server keeps no record of issued access
//! tokens; they stop working only when they expire.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use garage_core::types::{DbId, Timestamp};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The only signing algorithm accepted or produced.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Minimum signing key length in bytes (256 bits).
pub const MIN_KEY_BYTES: usize = 32;

/// Default access token lifetime in milliseconds (15 minutes).
pub const DEFAULT_ACCESS_TTL_MS: i64 = 15 * 60 * 1000;
/// Default refresh token lifetime in milliseconds (7 days).
pub const DEFAULT_REFRESH_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject -- the username.
    pub sub: String,
    /// The user's internal database id.
    pub user_id: DbId,
    /// Role names held at issuance time.
    pub roles: Vec<String>,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// Why an access token was rejected.
///
/// Callers treat every variant as "not authenticated"; the distinction only
/// matters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("unsupported token algorithm")]
    Unsupported,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => TokenError::Unsupported,
            _ => TokenError::Malformed,
        }
    }
}

/// Problems with the configured signing secret.
#[derive(Debug, thiserror::Error)]
pub enum SigningKeyError {
    #[error("signing key is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("signing key must be at least {MIN_KEY_BYTES} bytes, got {0}")]
    TooShort(usize),
}

/// Raw HMAC key bytes. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SigningKeyError> {
        if bytes.len() < MIN_KEY_BYTES {
            return Err(SigningKeyError::TooShort(bytes.len()));
        }
        Ok(Self(bytes))
    }

    /// Decode a standard-alphabet base64 secret.
    pub fn from_base64(encoded: &str) -> Result<Self, SigningKeyError> {
        Self::from_bytes(STANDARD.decode(encoded.trim())?)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 key used to sign and verify tokens.
    pub signing_key: SigningKey,
    /// Access token lifetime in milliseconds.
    pub access_token_ttl_ms: i64,
    /// Refresh token lifetime in milliseconds.
    pub refresh_token_ttl_ms: i64,
}

impl JwtConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::milliseconds(self.access_token_ttl_ms)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::milliseconds(self.refresh_token_ttl_ms)
    }
}

/// Stateless encoder/decoder for access tokens.
///
/// Built once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl AccessTokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_key.as_bytes()),
            ttl: config.access_token_ttl(),
            validation,
        }
    }

    /// Access token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `subject` that expires `ttl` after `issued_at`.
    pub fn encode(
        &self,
        subject: &str,
        user_id: DbId,
        roles: &[String],
        issued_at: Timestamp,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: subject.to_string(),
            user_id,
            roles: roles.to_vec(),
            iat: issued_at.timestamp(),
            exp: issued_at
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
    }

    /// Validate signature, algorithm and expiry, returning the embedded claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Read the subject of a token whose validity was already established.
    ///
    /// The signature is still checked but expiry is not, so this must never
    /// be the only authentication check on a request.
    pub fn subject_from_token(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.decode_ignoring_expiry(token)?.sub)
    }

    /// Read the role claims of a token whose validity was already established.
    ///
    /// Same caveat as [`Self::subject_from_token`].
    pub fn roles_from_token(&self, token: &str) -> Result<Vec<String>, TokenError> {
        Ok(self.decode_ignoring_expiry(token)?.roles)
    }

    fn decode_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = self.validation.clone();
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

impl std::fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
