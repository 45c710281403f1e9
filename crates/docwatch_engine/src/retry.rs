use std::time::Duration;

use async_trait::async_trait;
use docwatch_logging::watch_warn;

use crate::fetch::Fetcher;
use crate::notify::{ChangeNotifier, DispatchError};
use crate::{FetchError, FetchOutput};

/// How often a transient failure is attempted. `attempts` counts the first
/// try, so `1` disables retrying. The wait grows linearly with each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Retrying decorator around a fetcher or a notifier.
#[derive(Debug, Clone)]
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Fetcher> Fetcher for Retrying<T> {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(url).await {
                Err(err) if err.is_transient() && attempt < self.policy.attempts => {
                    watch_warn!("Fetch attempt {} for {} failed: {}", attempt, url, err);
                    tokio::time::sleep(self.policy.delay_before(attempt)).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<T: ChangeNotifier> ChangeNotifier for Retrying<T> {
    async fn notify(&self, url: &str) -> Result<(), DispatchError> {
        let mut attempt = 1;
        loop {
            match self.inner.notify(url).await {
                Err(err) if err.is_transient() && attempt < self.policy.attempts => {
                    watch_warn!("Dispatch attempt {} for {} failed: {}", attempt, url, err);
                    tokio::time::sleep(self.policy.delay_before(attempt)).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
