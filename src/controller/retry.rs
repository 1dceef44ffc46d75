use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Bounded retry for external source initialization
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, backoff_ms: 1000 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceStatus {
    Pending,
    Ready,
    /// Gave up; the game keeps running without this source
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pose,
    Segmentation,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pose => f.write_str("pose"),
            SourceKind::Segmentation => f.write_str("segmentation"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pose" => Ok(SourceKind::Pose),
            "segmentation" | "selfie" | "selfie_segmentation" => Ok(SourceKind::Segmentation),
            other => Err(Error::UnknownSource(other.to_string())),
        }
    }
}

/// Run `init` up to `policy.attempts` times, sleeping `policy.backoff_ms`
/// between failures. Never sleeps after the last attempt.
pub async fn initialize_with_retry<I, IF, E, S, SF>(
    kind: SourceKind,
    policy: RetryPolicy,
    mut init: I,
    mut sleep: S,
) -> SourceStatus
where
    I: FnMut() -> IF,
    IF: Future<Output = Result<(), E>>,
    E: fmt::Display,
    S: FnMut(u32) -> SF,
    SF: Future<Output = ()>,
{
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        match init().await {
            Ok(()) => {
                tracing::info!("{} source ready after {} attempt(s)", kind, attempt);
                return SourceStatus::Ready;
            }
            Err(e) => {
                tracing::warn!("{} init attempt {}/{} failed: {}", kind, attempt, attempts, e);
                if attempt < attempts {
                    sleep(policy.backoff_ms).await;
                }
            }
        }
    }
    tracing::error!("{} source disabled after {} failed attempts", kind, attempts);
    SourceStatus::Disabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_fails_then_succeeds() {
        let calls = Cell::new(0);
        let sleeps = RefCell::new(Vec::new());
        let status = pollster::block_on(initialize_with_retry(
            SourceKind::Pose,
            RetryPolicy::default(),
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { if n < 3 { Err("model not loaded") } else { Ok(()) } }
            },
            |ms| {
                sleeps.borrow_mut().push(ms);
                async {}
            },
        ));
        assert_eq!(status, SourceStatus::Ready);
        assert_eq!(calls.get(), 3);
        assert_eq!(*sleeps.borrow(), vec![1000, 1000]);
    }

    #[test]
    fn test_gives_up_without_trailing_sleep() {
        let calls = Cell::new(0);
        let sleeps = Cell::new(0);
        let status = pollster::block_on(initialize_with_retry(
            SourceKind::Segmentation,
            RetryPolicy { attempts: 3, backoff_ms: 5 },
            || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>("no camera") }
            },
            |_| {
                sleeps.set(sleeps.get() + 1);
                async {}
            },
        ));
        assert_eq!(status, SourceStatus::Disabled);
        assert_eq!(calls.get(), 3);
        assert_eq!(sleeps.get(), 2);
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!("Pose".parse::<SourceKind>().unwrap(), SourceKind::Pose);
        assert_eq!("selfie".parse::<SourceKind>().unwrap(), SourceKind::Segmentation);
        assert!(matches!("hands".parse::<SourceKind>(), Err(Error::UnknownSource(_))));
    }
}
