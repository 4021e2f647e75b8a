//! Bounded polling for background readiness

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::LangError;
use crate::models::config::ReadinessSettings;

#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::from(&ReadinessSettings::default())
    }
}

impl From<&ReadinessSettings> for WaitConfig {
    fn from(settings: &ReadinessSettings) -> Self {
        Self {
            interval: settings.interval(),
            max_attempts: settings.max_attempts.max(1),
        }
    }
}

/// Polls a readiness predicate until it holds, the bound runs out, or the
/// owning request is cancelled
#[derive(Debug, Clone)]
pub struct Waiter {
    config: WaitConfig,
    cancel: CancellationToken,
}

impl Waiter {
    pub fn new(config: WaitConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Wait until `predicate` reports ready
    ///
    /// A predicate error is returned as-is without retrying. Exhausting the
    /// bound yields [`LangError::SchemaNotReady`] naming `target`.
    pub async fn wait_for<F, Fut>(&self, mut predicate: F, target: impl Display) -> Result<(), LangError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, LangError>>,
    {
        for attempt in 1..=self.config.max_attempts {
            if self.cancel.is_cancelled() {
                return Err(LangError::Cancelled);
            }

            if predicate().await? {
                if attempt > 1 {
                    tracing::debug!("{} became ready after {} polls", target, attempt);
                }
                return Ok(());
            }

            if attempt == self.config.max_attempts {
                break;
            }

            tracing::trace!(
                "{} not ready (poll {}/{}), retrying in {:?}",
                target,
                attempt,
                self.config.max_attempts,
                self.config.interval
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(LangError::Cancelled),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        tracing::warn!(
            "{} still not ready after {} polls",
            target,
            self.config.max_attempts
        );
        Err(LangError::schema_not_ready(target))
    }
}
