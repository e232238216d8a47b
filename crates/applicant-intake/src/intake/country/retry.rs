use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{CountryInfo, CountryResolver, ResolveError};

/// Bounded retry around another resolver. Every attempt is capped by
/// `timeout`; only unavailability and timeouts are retried, `NotFound` is final.
pub struct RetryingResolver {
    inner: Arc<dyn CountryResolver>,
    attempts: u32,
    timeout: Duration,
}

impl RetryingResolver {
    pub const DEFAULT_ATTEMPTS: u32 = 2;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

    pub fn new(inner: Arc<dyn CountryResolver>, attempts: u32, timeout: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            timeout,
        }
    }

    pub fn with_defaults(inner: Arc<dyn CountryResolver>) -> Self {
        Self::new(inner, Self::DEFAULT_ATTEMPTS, Self::DEFAULT_TIMEOUT)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[async_trait]
impl CountryResolver for RetryingResolver {
    async fn resolve(&self, code: &str) -> Result<CountryInfo, ResolveError> {
        let mut last_failure = String::new();

        for attempt in 1..=self.attempts {
            match tokio::time::timeout(self.timeout, self.inner.resolve(code)).await {
                Ok(Ok(info)) => return Ok(info),
                Ok(Err(ResolveError::NotFound(code))) => return Err(ResolveError::NotFound(code)),
                Ok(Err(ResolveError::Unavailable(reason))) => last_failure = reason,
                Err(_) => {
                    last_failure = format!("timed out after {} ms", self.timeout.as_millis())
                }
            }

            warn!(
                attempt,
                max_attempts = self.attempts,
                reason = %last_failure,
                "country lookup attempt failed"
            );
        }

        Err(ResolveError::Unavailable(format!(
            "{last_failure} ({} attempt(s))",
            self.attempts
        )))
    }
}
