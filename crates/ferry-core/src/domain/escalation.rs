//! Failure escalation: raw error + signalled failure count -> retry or give up.
//!
//! Policies are pure functions. The queue owns the counter and the redelivery;
//! the handler only reads the count it was given.

use super::errors::{ErrorKind, ExportError};

/// What to tell the queue about a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Report `Aborted` so the task is redelivered.
    Retry,
    /// Report a permanent failure.
    GiveUp,
}

/// Trait for deciding whether a failed attempt is worth another delivery.
///
/// Any `Fn(&ExportError, u32) -> Escalation` closure is a policy, so tests and
/// deployments can plug in their own rule.
pub trait EscalationPolicy: Send + Sync {
    /// # Arguments
    /// * `error` - The error of the attempt that just failed
    /// * `signalled_failures` - How many earlier deliveries of this task failed
    fn escalate(&self, error: &ExportError, signalled_failures: u32) -> Escalation;
}

impl<F> EscalationPolicy for F
where
    F: Fn(&ExportError, u32) -> Escalation + Send + Sync,
{
    fn escalate(&self, error: &ExportError, signalled_failures: u32) -> Escalation {
        self(error, signalled_failures)
    }
}

/// Default policy: bounded retries for anything that is not a payload problem.
///
/// - Permanent errors give up for any count
/// - Others retry while `signalled_failures < max`
/// - Give up once `signalled_failures >= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxFailures {
    max: u32,
}

impl MaxFailures {
    pub fn new(max: u32) -> Self {
        Self { max }
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

impl EscalationPolicy for MaxFailures {
    fn escalate(&self, error: &ExportError, signalled_failures: u32) -> Escalation {
        match error.kind() {
            ErrorKind::Permanent => Escalation::GiveUp,
            ErrorKind::Transient | ErrorKind::Infrastructure => {
                if signalled_failures >= self.max {
                    Escalation::GiveUp
                } else {
                    Escalation::Retry
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::storage::StorageError;
    use rstest::rstest;

    fn unavailable() -> ExportError {
        ExportError::storage("get source", StorageError::Unavailable("503".into()))
    }

    #[rstest]
    #[case(0, Escalation::Retry)]
    #[case(3, Escalation::Retry)]
    #[case(4, Escalation::Retry)]
    #[case(5, Escalation::GiveUp)]
    #[case(6, Escalation::GiveUp)]
    #[case(u32::MAX, Escalation::GiveUp)]
    fn transient_errors_retry_until_ceiling(#[case] failures: u32, #[case] expected: Escalation) {
        let policy = MaxFailures::new(5);
        assert_eq!(policy.escalate(&unavailable(), failures), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(100)]
    fn permanent_errors_never_retry(#[case] failures: u32) {
        let policy = MaxFailures::new(5);
        let err = ExportError::EmptyField("File");
        assert_eq!(policy.escalate(&err, failures), Escalation::GiveUp);
    }

    #[test]
    fn zero_ceiling_never_retries() {
        let policy = MaxFailures::new(0);
        assert_eq!(policy.escalate(&unavailable(), 0), Escalation::GiveUp);
    }

    #[test]
    fn closures_are_policies() {
        let always_retry = |_: &ExportError, _: u32| Escalation::Retry;
        assert_eq!(always_retry.escalate(&unavailable(), 1000), Escalation::Retry);
    }
}
