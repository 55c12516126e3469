// dgraph-backup/src/utils/backoff.rs
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Growth and give-up rules for [`Backoff`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Multiplier applied after every failed check. Must be >= 1.0.
    pub factor: f64,
    /// Number of sleeps allowed before giving up.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5 * 60),
            factor: 2.0,
            max_attempts: 10,
        }
    }
}

/// Result of a readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition held after `attempts` failed checks.
    Ready { attempts: u32 },
    /// The attempt bound was reached without the condition holding.
    GaveUp { attempts: u32 },
}

/// Exponential backoff state, reusable across polls.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current_delay: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current_delay: policy.initial_delay.min(policy.max_delay),
            policy,
            attempts: 0,
        }
    }

    #[cfg(test)]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay that the next failed check will sleep for.
    #[cfg(test)]
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Consumes one attempt and returns its delay, or `None` once the
    /// attempt bound has been reached. Delays never decrease and never
    /// exceed `max_delay` until [`Backoff::reset`] is called.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        let delay = self.current_delay;
        self.attempts += 1;
        let grown = Duration::try_from_secs_f64(delay.as_secs_f64() * self.policy.factor)
            .unwrap_or(self.policy.max_delay);
        self.current_delay = grown.max(delay).min(self.policy.max_delay);
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.current_delay = self.policy.initial_delay.min(self.policy.max_delay);
        self.attempts = 0;
    }

    /// Runs `check` until it reports [`Readiness::Ready`], sleeping with a
    /// growing delay between failed checks. The state is reset when the
    /// poll finishes so the next poll starts from the initial delay again.
    pub async fn poll<F, Fut>(&mut self, mut check: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Readiness>,
    {
        loop {
            if check().await == Readiness::Ready {
                let attempts = self.attempts;
                self.reset();
                return PollOutcome::Ready { attempts };
            }

            match self.next_delay() {
                Some(delay) => {
                    info!(
                        attempt = self.attempts,
                        max_attempts = self.policy.max_attempts,
                        "Not ready yet, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    let attempts = self.attempts;
                    self.reset();
                    return PollOutcome::GaveUp { attempts };
                }
            }
        }
    }
}
