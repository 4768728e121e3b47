//! Bootstrap credentials: `<fingerprint-hex>.<signed-token>`.
//!
//! Agents receive the credential out of band. The fingerprint lets them pin the
//! authority certificate before trusting the hub; the token proves they were
//! handed the credential recently.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use crate::fingerprint::fingerprint;
use crate::token::{self, BootstrapClaims};
use crate::{HubError, IdentityProvider, TokenError};

/// Separator between the fingerprint and the token.
pub const DELIMITER: char = '.';

/// Opaque bootstrap credential string.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapCredential(String);

impl BootstrapCredential {
    /// Mint a credential at `now` for a hub rotating every `period`.
    ///
    /// The token expires at `now + 2 * period`.
    pub fn mint(
        identity: &dyn IdentityProvider,
        period: Duration,
        now: DateTime<Utc>,
    ) -> crate::Result<Self> {
        let expires_at = expiry_for(period, now)?;
        let signed = token::sign_token(identity.authority_private_key(), now, expires_at)?;
        let digest = fingerprint(identity.authority_certificate());

        Ok(Self(format!("{digest}{DELIMITER}{signed}")))
    }

    /// Split into `(fingerprint, token)` at the first delimiter.
    pub fn parse(&self) -> Result<(&str, &str), TokenError> {
        match self.0.split_once(DELIMITER) {
            Some((fp, token)) if !fp.is_empty() && !token.is_empty() => Ok((fp, token)),
            _ => Err(TokenError::Malformed(
                "expected <fingerprint>.<token>".into(),
            )),
        }
    }

    /// Credential as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Credential bytes, as handed to the publisher.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<String> for BootstrapCredential {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BootstrapCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// The token is a bearer secret; only the fingerprint is printed.
impl fmt::Debug for BootstrapCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fp = self.0.split_once(DELIMITER).map_or("?", |(fp, _)| fp);
        write!(f, "BootstrapCredential({fp}.<token>)")
    }
}

/// Expiry of a credential minted at `now` for a hub rotating every `period`.
pub fn expiry_for(period: Duration, now: DateTime<Utc>) -> crate::Result<DateTime<Utc>> {
    let validity = period
        .checked_mul(2)
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .ok_or_else(|| HubError::Signing(format!("rotation period {period:?} overflows")))?;
    now.checked_add_signed(validity)
        .ok_or_else(|| HubError::Signing("token expiry out of range".into()))
}

/// Check a credential presented by an agent against the authority.
///
/// The fingerprint must match the authority certificate, and the token must
/// carry a valid signature and not be expired as of `now`.
pub fn verify_credential(
    credential: &BootstrapCredential,
    identity: &dyn IdentityProvider,
    now: DateTime<Utc>,
) -> Result<BootstrapClaims, TokenError> {
    let (fp, token) = credential.parse()?;

    if fp != fingerprint(identity.authority_certificate()) {
        return Err(TokenError::FingerprintMismatch);
    }

    token::verify_token_at(token, identity.authority_private_key(), now)
}
