use std::time::Duration;

use tracing::{debug, warn};

use super::channel::{DeliveryError, PageChannel, TabId};
use super::messages::Message;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// At-most-one-retry delivery: one attempt, then a single retry after
/// `retry_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: DeliveryError },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts } | DeliveryOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Send `message` to `tab`, waiting `policy.retry_delay` between attempts.
/// Never retries beyond `policy.max_attempts`; the final failure is logged
/// and returned, not raised.
pub async fn deliver_with_retry(
    channel: &dyn PageChannel,
    tab: TabId,
    message: &Message,
    policy: &RetryPolicy,
) -> DeliveryOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match channel.send(tab, message) {
            Ok(()) => {
                debug!(%tab, action = message.action(), attempt, "message delivered");
                return DeliveryOutcome::Delivered { attempts: attempt };
            }
            Err(error) if attempt >= max_attempts => {
                warn!(
                    %tab,
                    action = message.action(),
                    attempts = attempt,
                    error = %error,
                    "giving up on message delivery"
                );
                return DeliveryOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }
            Err(error) => {
                debug!(%tab, action = message.action(), attempt, error = %error, "delivery failed, retrying");
                tokio::time::sleep(policy.retry_delay).await;
                attempt += 1;
            }
        }
    }
}
