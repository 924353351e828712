//! Human-scale pauses between interactive actions. Purely cosmetic: nothing
//! depends on them for correctness, and tests run with pacing disabled.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
    /// Fixed wait after triggering pagination.
    page: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration, page: Duration) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
            page,
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Randomized delay in `[min, max]`.
    pub fn next_delay(&self) -> Duration {
        if self.max.is_zero() || self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    pub async fn page_pause(&self) {
        if !self.page.is_zero() {
            sleep(self.page).await;
        }
    }
}
