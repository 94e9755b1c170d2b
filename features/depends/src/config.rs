use crate::errors::{InjectError, TeardownError};

/// How failures while releasing resources are reported to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TeardownPolicy {
    /// Every release runs. If the call succeeded, the first release failure is returned.
    /// An error from resolution or the operation takes precedence.
    #[default]
    FirstFailure,
    /// Release failures are only logged
    LogAndContinue,
}

impl TeardownPolicy {
    /// Combines the outcome of a call with the failures of its teardown
    pub(crate) fn settle<T>(
        self,
        outcome: Result<T, InjectError>,
        failures: Vec<TeardownError>,
    ) -> Result<T, InjectError> {
        match self {
            TeardownPolicy::LogAndContinue => outcome,
            TeardownPolicy::FirstFailure => match (outcome, failures.into_iter().next()) {
                (Ok(_), Some(failure)) => Err(failure.into()),
                (outcome, _) => outcome,
            },
        }
    }
}

/// Settings of an [Operation](crate::operation::Operation)
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub teardown_policy: TeardownPolicy,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teardown_policy(mut self, policy: TeardownPolicy) -> Self {
        self.teardown_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::DynError;

    fn release_failure(factory: &'static str) -> TeardownError {
        TeardownError::ReleaseFailed {
            factory,
            error: Arc::new(DynError::from("closed twice")),
        }
    }

    #[test]
    fn first_failure_reports_teardown_after_success() {
        let settled = TeardownPolicy::FirstFailure.settle(
            Ok(1),
            vec![release_failure("first"), release_failure("second")],
        );

        assert!(matches!(
            settled,
            Err(InjectError::Teardown(TeardownError::ReleaseFailed {
                factory: "first",
                ..
            }))
        ));
    }

    #[test]
    fn call_error_takes_precedence() {
        let settled: Result<(), _> = TeardownPolicy::FirstFailure.settle(
            Err(InjectError::Operation {
                operation: "op",
                error: "boom".into(),
            }),
            vec![release_failure("first")],
        );

        assert!(matches!(settled, Err(InjectError::Operation { .. })));
    }

    #[test]
    fn log_and_continue_keeps_outcome() {
        let settled = TeardownPolicy::LogAndContinue.settle(Ok("done"), vec![release_failure("a")]);

        assert_eq!(settled.unwrap(), "done");
        assert_eq!(EngineConfig::default().teardown_policy, TeardownPolicy::FirstFailure);
    }
}
