//! Error types for hub-bootstrap.

use thiserror::Error;

/// Errors that can occur while issuing certificates or rotating credentials.
#[derive(Error, Debug)]
pub enum HubError {
    /// Server certificate or key generation failed.
    #[error("certificate issuance failed: {0}")]
    Issuance(String),

    /// Bootstrap token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The publisher rejected the new credential.
    #[error("credential publish failed: {0}")]
    Publish(String),

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(String),

    /// A presented credential did not verify.
    #[error("credential verification failed: {0}")]
    Token(#[from] TokenError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config parse error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl HubError {
    /// Short name of the step that failed, for diagnostic log lines.
    pub const fn step(&self) -> &'static str {
        match self {
            Self::Issuance(_) => "issue",
            Self::Signing(_) => "sign",
            Self::Publish(_) => "publish",
            Self::Config(_) | Self::Toml(_) => "config",
            Self::Token(_) => "verify",
            Self::Io(_) => "io",
        }
    }
}

/// Reasons a bootstrap credential or token is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token was validly signed but its expiry has passed.
    #[error("token expired at {expired_at}")]
    Expired {
        /// Expiry claim (seconds since epoch).
        expired_at: i64,
    },

    /// Signature did not verify with the authority key.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Credential or token could not be decoded.
    #[error("malformed credential: {0}")]
    Malformed(String),

    /// Fingerprint does not match the authority certificate.
    #[error("authority fingerprint mismatch")]
    FingerprintMismatch,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::Malformed(err.to_string()),
        }
    }
}
