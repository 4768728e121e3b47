//! Server certificate issuance.
//!
//! Issues the hub's TLS server certificate, signed by the authority, valid for
//! every advertised DNS name and IP address. Issuance is stateless: each call
//! generates a fresh key pair and nothing is cached or persisted.

use rcgen::{
    string::Ia5String, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
};
use rustls_pki_types::CertificateDer;
use std::net::IpAddr;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{HubError, IdentityProvider};

/// Default server certificate validity in days.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Longest server certificate validity accepted, in days (100 years).
pub const MAX_VALIDITY_DAYS: u32 = 100 * 365;

/// Extended key usages a server certificate may carry.
///
/// Hub certificates only ever authenticate the server side of TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// TLS server authentication.
    ServerAuth,
}

impl From<Usage> for ExtendedKeyUsagePurpose {
    fn from(usage: Usage) -> Self {
        match usage {
            Usage::ServerAuth => Self::ServerAuth,
        }
    }
}

/// Subject alternative names for a server certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltNames {
    /// DNS names, used verbatim.
    pub dns_names: Vec<String>,
    /// IP addresses.
    pub ips: Vec<IpAddr>,
}

impl AltNames {
    /// Build alt names from DNS names and textual addresses.
    ///
    /// Addresses that do not parse are dropped; see [`parse_ips`].
    pub fn new<S: AsRef<str>>(dns_names: Vec<String>, addresses: &[S]) -> Self {
        Self {
            dns_names,
            ips: parse_ips(addresses),
        }
    }
}

/// Parse textual addresses, dropping any that are not valid IPs.
///
/// Each dropped entry is logged at `warn`.
pub fn parse_ips<S: AsRef<str>>(addresses: &[S]) -> Vec<IpAddr> {
    addresses
        .iter()
        .filter_map(|addr| {
            let addr = addr.as_ref();
            match addr.trim().parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(e) => {
                    warn!(address = %addr, error = %e, "dropping unparseable advertise address");
                    None
                }
            }
        })
        .collect()
}

/// Parameters for one server certificate.
#[derive(Debug, Clone)]
pub struct ServerCertRequest {
    /// Subject common name.
    pub common_name: String,
    /// Subject organization.
    pub organization: String,
    /// Extended key usages.
    pub usages: Vec<Usage>,
    /// Subject alternative names.
    pub alt_names: AltNames,
    /// Validity from now, in days.
    pub validity_days: u32,
}

impl ServerCertRequest {
    /// Server-auth request with the default validity.
    pub fn server(common_name: &str, organization: &str, alt_names: AltNames) -> Self {
        Self {
            common_name: common_name.to_string(),
            organization: organization.to_string(),
            usages: vec![Usage::ServerAuth],
            alt_names,
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}

/// An issued certificate and its private key, both DER-encoded.
#[derive(Clone)]
pub struct IssuedCertificate {
    /// Certificate DER.
    pub certificate: Vec<u8>,
    /// PKCS#8 private key DER.
    pub private_key: Vec<u8>,
}

impl std::fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("certificate_len", &self.certificate.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Issue a server certificate signed by the authority.
///
/// Failures are local to this call; callers retry on next demand.
pub fn issue_server_certificate(
    identity: &dyn IdentityProvider,
    request: &ServerCertRequest,
) -> crate::Result<IssuedCertificate> {
    if request.common_name.is_empty() {
        return Err(HubError::Issuance("common name must not be empty".into()));
    }
    if request.organization.is_empty() {
        return Err(HubError::Issuance("organization must not be empty".into()));
    }

    let mut params = CertificateParams::default();

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, request.common_name.as_str());
    dn.push(DnType::OrganizationName, request.organization.as_str());
    params.distinguished_name = dn;

    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = request.usages.iter().copied().map(Into::into).collect();

    let mut sans = Vec::with_capacity(request.alt_names.dns_names.len() + request.alt_names.ips.len());
    for name in &request.alt_names.dns_names {
        let dns = Ia5String::try_from(name.clone())
            .map_err(|e| HubError::Issuance(format!("invalid DNS name '{name}': {e}")))?;
        sans.push(SanType::DnsName(dns));
    }
    sans.extend(request.alt_names.ips.iter().copied().map(SanType::IpAddress));
    params.subject_alt_names = sans;

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now
        .checked_add(time::Duration::days(i64::from(request.validity_days)))
        .ok_or_else(|| {
            HubError::Issuance(format!(
                "validity of {} days is out of range",
                request.validity_days
            ))
        })?;

    let serial = Uuid::new_v4();
    params.serial_number = Some((serial.as_u128() as u64).into());

    let authority_key = KeyPair::try_from(identity.authority_private_key())
        .map_err(|e| HubError::Issuance(format!("failed to load authority key: {e}")))?;
    let authority_cert = CertificateDer::from(identity.authority_certificate());
    let issuer = Issuer::from_ca_cert_der(&authority_cert, authority_key)
        .map_err(|e| HubError::Issuance(format!("failed to load authority certificate: {e}")))?;

    let server_key = KeyPair::generate()
        .map_err(|e| HubError::Issuance(format!("failed to generate server key: {e}")))?;
    let certificate = params
        .signed_by(&server_key, &issuer)
        .map_err(|e| HubError::Issuance(format!("failed to sign server certificate: {e}")))?;

    debug!(
        common_name = %request.common_name,
        dns_names = request.alt_names.dns_names.len(),
        ips = request.alt_names.ips.len(),
        "issued server certificate"
    );

    Ok(IssuedCertificate {
        certificate: certificate.der().to_vec(),
        private_key: server_key.serialize_der(),
    })
}
