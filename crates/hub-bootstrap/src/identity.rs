//! Authority identity material.
//!
//! The authority certificate and private key are loaded once, before the hub
//! starts, and never change afterwards. Components hold them behind an
//! `Arc<dyn IdentityProvider>` and read them without locking.

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose,
};
use std::fmt;

use crate::HubError;

/// Validity of a freshly generated authority certificate (10 years).
const AUTHORITY_VALIDITY_DAYS: i64 = 10 * 365;

/// Read-only access to the authority's certificate and key.
///
/// Implementations must return the same bytes for the lifetime of the process.
pub trait IdentityProvider: Send + Sync {
    /// DER-encoded authority certificate.
    fn authority_certificate(&self) -> &[u8];

    /// PKCS#8 DER-encoded authority private key.
    fn authority_private_key(&self) -> &[u8];
}

/// Authority certificate and private key, both DER-encoded.
#[derive(Clone)]
pub struct AuthorityIdentity {
    certificate: Vec<u8>,
    private_key: Vec<u8>,
}

impl AuthorityIdentity {
    /// Wrap already-loaded authority material.
    pub const fn new(certificate: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            certificate,
            private_key,
        }
    }

    /// Generate a fresh self-signed authority (ECDSA P-256).
    ///
    /// Used when a hub starts without existing authority material. Persisting
    /// the result is the caller's job.
    pub fn generate(common_name: &str) -> crate::Result<Self> {
        let key_pair = KeyPair::generate()
            .map_err(|e| HubError::Issuance(format!("authority key generation: {e}")))?;

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        dn.push(DnType::OrganizationName, common_name);
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];

        let now = time::OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + time::Duration::days(AUTHORITY_VALIDITY_DAYS);

        let certificate = params
            .self_signed(&key_pair)
            .map_err(|e| HubError::Issuance(format!("authority self-sign: {e}")))?;

        Ok(Self {
            certificate: certificate.der().to_vec(),
            private_key: key_pair.serialize_der(),
        })
    }
}

impl IdentityProvider for AuthorityIdentity {
    fn authority_certificate(&self) -> &[u8] {
        &self.certificate
    }

    fn authority_private_key(&self) -> &[u8] {
        &self.private_key
    }
}

// Key bytes stay out of logs.
impl fmt::Debug for AuthorityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityIdentity")
            .field("certificate_len", &self.certificate.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}
