//! Bootstrap credential rotation.
//!
//! A single background task mints a new credential once per period and hands
//! it to the publisher. Rotations never overlap: the loop finishes one publish
//! before it waits for the next tick.
//!
//! ```text
//! Idle ──tick──> Rotating ──publish ok──> Published ──> Idle
//!                   │
//!                   └──sign/publish error──> run() returns Err ──> supervise() exits
//! ```
//!
//! The rotator never terminates the process itself. [`supervise`] owns that
//! policy so the loop stays testable.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::credential::expiry_for;
use crate::{BootstrapCredential, CredentialPublisher, HubConfig, HubError, IdentityProvider};

/// Periodically mints and publishes bootstrap credentials.
pub struct CredentialRotator {
    identity: Arc<dyn IdentityProvider>,
    publisher: Arc<dyn CredentialPublisher>,
    period: Duration,
}

impl CredentialRotator {
    /// Create a rotator. `period` must be non-zero.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        publisher: Arc<dyn CredentialPublisher>,
        period: Duration,
    ) -> crate::Result<Self> {
        if period.is_zero() {
            return Err(HubError::Config("rotation period must be non-zero".into()));
        }
        Ok(Self {
            identity,
            publisher,
            period,
        })
    }

    /// Create a rotator using the configured rotation period.
    pub fn from_config(
        config: &HubConfig,
        identity: Arc<dyn IdentityProvider>,
        publisher: Arc<dyn CredentialPublisher>,
    ) -> crate::Result<Self> {
        config.validate()?;
        Self::new(identity, publisher, config.rotation_period())
    }

    /// Rotation period.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Mint a credential as of `now` and publish it.
    ///
    /// On error nothing is published and the previous credential stays current.
    pub async fn rotate_once(&self, now: DateTime<Utc>) -> crate::Result<BootstrapCredential> {
        let expires_at = expiry_for(self.period, now)?;
        let credential = BootstrapCredential::mint(self.identity.as_ref(), self.period, now)?;
        self.publisher.publish(&credential).await?;

        let fingerprint = credential.parse().map_or("", |(fp, _)| fp);
        info!(
            fingerprint = %fingerprint,
            expires_at = %expires_at.to_rfc3339(),
            "published bootstrap credential"
        );

        Ok(credential)
    }

    /// Rotate immediately, then once per period, until `cancel` fires.
    ///
    /// Returns `Ok(())` on cancellation. Returns the first signing or publish
    /// error without retrying.
    pub async fn run(&self, cancel: CancellationToken) -> crate::Result<()> {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_secs = self.period.as_secs(), "credential rotation started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("credential rotation stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            self.rotate_once(Utc::now()).await?;
        }
    }

    /// Run the rotation loop on a background task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<crate::Result<()>> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}

/// Wait for a spawned rotator and terminate the process if it fails.
///
/// A task stopped with `abort()` is a deliberate shutdown and returns quietly.
///
/// An unrotated credential is worse than a crash: a dead hub is visible to
/// monitoring, a stale credential is not. Restart is left to the process
/// supervisor.
pub async fn supervise(handle: JoinHandle<crate::Result<()>>) {
    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(step = e.step(), error = %e, "credential rotation failed, exiting");
            std::process::exit(1);
        }
        Err(e) if e.is_cancelled() => {
            info!("credential rotation task aborted");
        }
        Err(e) => {
            error!(error = %e, "credential rotation task panicked, exiting");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify_credential, AuthorityIdentity, MemoryPublisher, TokenError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const HOUR: Duration = Duration::from_secs(3600);

    /// Memory publisher whose backing store can be taken offline.
    #[derive(Default)]
    struct OutagePublisher {
        inner: MemoryPublisher,
        down: AtomicBool,
    }

    #[async_trait]
    impl CredentialPublisher for OutagePublisher {
        async fn publish(&self, credential: &BootstrapCredential) -> crate::Result<()> {
            if self.down.load(Ordering::Acquire) {
                return Err(HubError::Publish("secret store unavailable".into()));
            }
            self.inner.publish(credential).await
        }
    }

    fn identity() -> Arc<AuthorityIdentity> {
        Arc::new(AuthorityIdentity::new(
            b"authority-cert-der".to_vec(),
            b"authority-key-der".to_vec(),
        ))
    }

    #[test]
    fn test_zero_period_rejected() {
        let result = CredentialRotator::new(identity(), Arc::new(MemoryPublisher::new()), Duration::ZERO);
        assert!(matches!(result, Err(HubError::Config(_))));
    }

    #[test]
    fn test_from_config_uses_refresh_hours() {
        let config = HubConfig {
            token_refresh_hours: 3,
            ..HubConfig::default()
        };
        let rotator =
            CredentialRotator::from_config(&config, identity(), Arc::new(MemoryPublisher::new()))
                .unwrap();
        assert_eq!(rotator.period(), 3 * HOUR);
    }

    #[tokio::test]
    async fn test_rotate_once_publishes_doubled_expiry() {
        let publisher = Arc::new(MemoryPublisher::new());
        let rotator = CredentialRotator::new(identity(), publisher.clone(), HOUR).unwrap();

        let now = Utc::now();
        let credential = rotator.rotate_once(now).await.unwrap();

        assert_eq!(*publisher.current().unwrap(), credential);
        let claims = verify_credential(&credential, identity().as_ref(), now).unwrap();
        assert_eq!(claims.exp, (now + chrono::Duration::hours(2)).timestamp());
    }

    #[tokio::test]
    async fn test_rotation_overlap_scenario() {
        let publisher = Arc::new(MemoryPublisher::new());
        let rotator = CredentialRotator::new(identity(), publisher.clone(), HOUR).unwrap();
        let t0 = Utc::now();

        let a = rotator.rotate_once(t0).await.unwrap();
        let b = rotator
            .rotate_once(t0 + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(*publisher.current().unwrap(), b);

        let midway = t0 + chrono::Duration::minutes(90);
        let claims_a = verify_credential(&a, identity().as_ref(), midway).unwrap();
        let claims_b = verify_credential(&b, identity().as_ref(), midway).unwrap();
        assert_eq!(claims_a.exp, (t0 + chrono::Duration::hours(2)).timestamp());
        assert_eq!(claims_b.exp, (t0 + chrono::Duration::hours(3)).timestamp());

        let late = t0 + chrono::Duration::minutes(150);
        assert!(matches!(
            verify_credential(&a, identity().as_ref(), late),
            Err(TokenError::Expired { .. })
        ));
        assert!(verify_credential(&b, identity().as_ref(), late).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_rotates_every_period_until_cancelled() {
        let publisher = Arc::new(MemoryPublisher::new());
        let rotator = CredentialRotator::new(identity(), publisher.clone(), HOUR).unwrap();
        let cancel = CancellationToken::new();
        let handle = rotator.spawn(cancel.clone());

        // Ticks at 0h, 1h and 2h.
        tokio::time::sleep(2 * HOUR + Duration::from_secs(60)).await;
        assert_eq!(publisher.publish_count(), 3);

        cancel.cancel();
        handle.await.unwrap().unwrap();

        // No publishes after shutdown.
        tokio::time::sleep(3 * HOUR).await;
        assert_eq!(publisher.publish_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_publishes_nothing() {
        let publisher = Arc::new(MemoryPublisher::new());
        let rotator = CredentialRotator::new(identity(), publisher.clone(), HOUR).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        rotator.run(cancel).await.unwrap();
        assert_eq!(publisher.publish_count(), 0);
        assert!(publisher.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_outage_ends_run_and_keeps_previous_credential() {
        let publisher = Arc::new(OutagePublisher::default());
        let rotator = CredentialRotator::new(identity(), publisher.clone(), HOUR).unwrap();
        let handle = rotator.spawn(CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(60)).await;
        let before = publisher.inner.current().unwrap();
        publisher.down.store(true, Ordering::Release);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, HubError::Publish(_)));
        assert_eq!(err.step(), "publish");

        // The last good credential is still what readers get.
        assert_eq!(publisher.inner.publish_count(), 1);
        assert_eq!(publisher.inner.current().unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signing_failure_ends_run_without_publishing() {
        let publisher = Arc::new(MemoryPublisher::new());
        let rotator = CredentialRotator::new(identity(), publisher.clone(), Duration::MAX).unwrap();

        let err = rotator.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, HubError::Signing(_)));
        assert_eq!(err.step(), "sign");
        assert_eq!(publisher.publish_count(), 0);
        assert!(publisher.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervise_returns_on_abort() {
        let rotator =
            CredentialRotator::new(identity(), Arc::new(MemoryPublisher::new()), HOUR).unwrap();
        let handle = rotator.spawn(CancellationToken::new());
        handle.abort();

        // Exiting here would take the test binary down with it.
        supervise(handle).await;
    }

    #[tokio::test]
    async fn test_failed_publish_returns_error_without_side_effects() {
        let publisher = Arc::new(OutagePublisher::default());
        publisher.down.store(true, Ordering::Release);
        let rotator = CredentialRotator::new(identity(), publisher.clone(), HOUR).unwrap();

        let err = rotator.rotate_once(Utc::now()).await.unwrap_err();
        assert!(matches!(err, HubError::Publish(_)));
        assert!(publisher.inner.current().is_none());
    }
}
