//! Signed bootstrap tokens.
//!
//! Tokens are compact JWTs signed with HS256, keyed by the authority's private
//! key bytes. Only the expiry matters to verifiers; `iat` is carried so that two
//! tokens minted at different times never collide.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{HubError, TokenError};

/// Claims carried by a bootstrap token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapClaims {
    /// Expiration time (seconds since epoch).
    pub exp: i64,
    /// Issued at (seconds since epoch).
    pub iat: i64,
}

impl BootstrapClaims {
    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Sign a token valid until `expires_at`.
pub fn sign_token(
    key: &[u8],
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> crate::Result<String> {
    let claims = BootstrapClaims {
        exp: expires_at.timestamp(),
        iat: issued_at.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key),
    )
    .map_err(|e| HubError::Signing(e.to_string()))
}

/// Verify a token's signature and check it has not expired as of `now`.
///
/// A token is valid while `now < exp`. Expired tokens with a good signature
/// yield [`TokenError::Expired`]; signature and decoding failures are reported
/// separately.
pub fn verify_token_at(
    token: &str,
    key: &[u8],
    now: DateTime<Utc>,
) -> Result<BootstrapClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked below against the caller's clock.
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<BootstrapClaims>(token, &DecodingKey::from_secret(key), &validation)?;

    if now.timestamp() >= data.claims.exp {
        return Err(TokenError::Expired {
            expired_at: data.claims.exp,
        });
    }

    Ok(data.claims)
}

/// Verify a token against the current wall clock.
pub fn verify_token(token: &str, key: &[u8]) -> Result<BootstrapClaims, TokenError> {
    verify_token_at(token, key, Utc::now())
}
