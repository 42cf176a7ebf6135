use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds before expiry at which a token becomes due for renewal.
pub const MIN_VALIDITY_SECS: u64 = 25;

pub trait Clock: Send + Sync + 'static {
    fn now_epoch_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// One-shot wake-up scheduler for token renewal. Each cycle is armed again
/// by the caller, so there is no recurring timer to drift.
#[derive(Clone)]
pub struct TokenClock {
    clock: Arc<dyn Clock>,
    margin: Duration,
}

impl TokenClock {
    pub fn new(clock: Arc<dyn Clock>, margin: Duration) -> Self {
        Self { clock, margin }
    }

    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Duration::from_secs(MIN_VALIDITY_SECS),
        )
    }

    pub fn margin(&self) -> Duration {
        self.margin
    }

    pub fn now_epoch_ms(&self) -> i64 {
        self.clock.now_epoch_ms()
    }

    /// Delay until `expires_at_epoch_ms - margin`, clamped to zero for
    /// tokens that are already inside the margin (or already expired).
    pub fn renewal_delay(&self, expires_at_epoch_ms: i64) -> Duration {
        let due_at = expires_at_epoch_ms.saturating_sub(self.margin.as_millis() as i64);
        let remaining = due_at.saturating_sub(self.now_epoch_ms());
        u64::try_from(remaining)
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO)
    }

    pub async fn wait_until_due(&self, expires_at_epoch_ms: i64) {
        let delay = self.renewal_delay(expires_at_epoch_ms);
        tracing::debug!(
            delay_ms = delay.as_millis() as u64,
            "access token renewal scheduled"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
