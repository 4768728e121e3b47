//! hub-bootstrap: trust material for edge agent registration.
//!
//! The control plane authenticates remote agents before they register. This
//! crate produces the two pieces of trust material that handshake depends on:
//!
//! - A **server certificate** bound to the hub's advertised DNS names and IPs,
//!   signed by the authority (see [`issuer`]).
//! - A rotating **bootstrap credential**: the authority certificate's SHA-256
//!   fingerprint joined with a short-lived HS256 token (see [`credential`]).
//!
//! # Architecture
//!
//! ```text
//! AuthorityIdentity ──┬──> issue_server_certificate()     (on demand)
//!                     │
//!                     └──> CredentialRotator ──tick──> CredentialPublisher
//!                              (every period)              │
//!                                                          └──> registration endpoint
//! ```
//!
//! Each credential expires two rotation periods after it is minted, so a
//! credential fetched just before a rotation stays valid for at least one more
//! full period.

pub mod config;
pub mod credential;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod issuer;
pub mod publisher;
pub mod rotator;
pub mod token;

// Re-exports for convenience.
pub use config::HubConfig;
pub use credential::{verify_credential, BootstrapCredential};
pub use error::{HubError, TokenError};
pub use identity::{AuthorityIdentity, IdentityProvider};
pub use issuer::{issue_server_certificate, AltNames, IssuedCertificate, ServerCertRequest};
pub use publisher::{CredentialPublisher, MemoryPublisher};
pub use rotator::CredentialRotator;

/// Result type for hub-bootstrap operations.
pub type Result<T> = std::result::Result<T, HubError>;
