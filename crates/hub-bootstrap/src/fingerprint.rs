//! SHA-256 fingerprints of authority certificates via `ring::digest`.

use ring::digest::SHA256;

/// Length of a rendered fingerprint (64 lowercase hex characters).
pub const FINGERPRINT_LEN: usize = 64;

/// Compute the SHA-256 fingerprint of certificate DER bytes.
///
/// Returns lowercase hex-encoded digest.
#[must_use]
pub fn fingerprint(cert_der: &[u8]) -> String {
    let digest = ring::digest::digest(&SHA256, cert_der);
    hex::encode(digest.as_ref())
}
