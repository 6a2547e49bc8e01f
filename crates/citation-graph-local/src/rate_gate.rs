use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// A minimum-interval gate shared across all outbound Metadata Client calls
/// (spec §5): "respect upstream's stated limits (~1 rps with key, ~1 req / 3s
/// without)... a simple token-bucket or minimum-interval gate is sufficient."
pub struct RateGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// With an API key, upstream allows ~1 request/second.
    pub fn with_api_key() -> Self {
        Self::new(Duration::from_secs(1))
    }

    /// Without a key, upstream allows ~1 request/3 seconds.
    pub fn without_api_key() -> Self {
        Self::new(Duration::from_secs(3))
    }

    /// Blocks the caller until at least `min_interval` has elapsed since the
    /// gate's last release.
    pub async fn acquire(&self) {
        let mut guard = self.last.lock().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }
}
