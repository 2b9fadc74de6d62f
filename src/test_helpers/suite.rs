//! # Ordered Suite Runner
//!
//! Runs test cases against one shared context in an explicit order.
//!
//! Cases carry an order key; cases without one run last. Sorting is stable,
//! so cases with equal keys keep their registration order. A panicking or
//! failing case is recorded and the remaining cases still run.
//! [`run_suite`] wraps the run in provisioning and teardown, and teardown
//! happens before any failure is reported.

use anyhow::Context;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

use crate::error::StormTrackerResult;

pub type CaseResult = anyhow::Result<()>;

/// Order key of cases that do not set one
pub const DEFAULT_ORDER: i32 = i32::MAX;

type CaseFn<C> = Box<dyn Fn(C) -> BoxFuture<'static, CaseResult> + Send + Sync>;

pub struct OrderedCase<C> {
    name: String,
    order: i32,
    run: CaseFn<C>,
}

impl<C> OrderedCase<C> {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            order: DEFAULT_ORDER,
            run: Box::new(move |context| f(context).boxed()),
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> i32 {
        self.order
    }
}

impl<C> std::fmt::Debug for OrderedCase<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedCase")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed(String),
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub name: String,
    pub order: i32,
    pub status: CaseStatus,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Passed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: String,
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(CaseOutcome::passed)
    }

    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed()).collect()
    }

    /// Names in the order the cases actually ran
    pub fn executed(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.name.as_str()).collect()
    }

    pub fn ensure_success(&self) -> anyhow::Result<()> {
        if self.is_success() {
            return Ok(());
        }
        let details = self
            .failures()
            .iter()
            .map(|o| match &o.status {
                CaseStatus::Failed(msg) => format!("{}: failed: {msg}", o.name),
                CaseStatus::Panicked(msg) => format!("{}: panicked: {msg}", o.name),
                CaseStatus::Passed => o.name.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("suite '{}' had failing cases: {details}", self.suite)
    }
}

pub struct OrderedSuite<C> {
    name: String,
    cases: Vec<OrderedCase<C>>,
}

impl<C> std::fmt::Debug for OrderedSuite<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedSuite")
            .field("name", &self.name)
            .field("cases", &self.cases)
            .finish()
    }
}

impl<C: Clone + Send + 'static> OrderedSuite<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(mut self, case: OrderedCase<C>) -> Self {
        self.cases.push(case);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case names in the order [`run`](Self::run) will execute them
    pub fn execution_order(&self) -> Vec<&str> {
        let mut refs: Vec<&OrderedCase<C>> = self.cases.iter().collect();
        refs.sort_by_key(|c| c.order);
        refs.into_iter().map(|c| c.name.as_str()).collect()
    }

    /// Run every case sequentially against `context`
    pub async fn run(mut self, context: C) -> SuiteReport {
        self.cases.sort_by_key(|c| c.order);

        let mut outcomes = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            info!(suite = %self.name, case = %case.name, order = case.order, "Running case");

            let run = &case.run;
            let ctx = context.clone();
            let result = AssertUnwindSafe(async move { run(ctx).await })
                .catch_unwind()
                .await;

            let status = match result {
                Ok(Ok(())) => CaseStatus::Passed,
                Ok(Err(e)) => {
                    error!(case = %case.name, error = %e, "Case failed");
                    CaseStatus::Failed(format!("{e:#}"))
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(case = %case.name, panic = %message, "Case panicked");
                    CaseStatus::Panicked(message)
                }
            };

            outcomes.push(CaseOutcome {
                name: case.name.clone(),
                order: case.order,
                status,
            });
        }

        SuiteReport {
            suite: self.name,
            outcomes,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Provisions a context for a suite and releases it afterwards
#[async_trait]
pub trait SuiteHarness: Send {
    type Context: Clone + Send + 'static;

    async fn provision(&mut self) -> StormTrackerResult<Self::Context>;

    async fn teardown(&mut self) -> StormTrackerResult<()>;
}

/// Provision, run the suite, tear down, then report.
///
/// Teardown runs whether cases pass, fail or panic, and also after a failed
/// provision. Case failures surface as the returned error, with any teardown
/// error attached as context.
pub async fn run_suite<H: SuiteHarness>(
    harness: &mut H,
    suite: OrderedSuite<H::Context>,
) -> anyhow::Result<SuiteReport> {
    let context = match harness.provision().await {
        Ok(context) => context,
        Err(e) => {
            if let Err(teardown_err) = harness.teardown().await {
                warn!(error = %teardown_err, "Teardown after failed provisioning also failed");
            }
            return Err(e).with_context(|| format!("setup failed for suite '{}'", suite.name()));
        }
    };

    let report = suite.run(context).await;
    let teardown = harness.teardown().await;

    match (report.ensure_success(), teardown) {
        (Ok(()), Ok(())) => Ok(report),
        (Ok(()), Err(e)) => {
            Err(e).with_context(|| format!("teardown failed for suite '{}'", report.suite))
        }
        (Err(cases), Ok(())) => Err(cases),
        (Err(cases), Err(e)) => {
            warn!(suite = %report.suite, error = %e, "Teardown failed after failing cases");
            Err(cases.context(format!(
                "teardown failed for suite '{}': {e}",
                report.suite
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StormTrackerError;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    async fn panicking_case(_log: Log) -> CaseResult {
        panic!("boom")
    }

    async fn failing_case(_log: Log) -> CaseResult {
        anyhow::bail!("expected 2, got 3")
    }

    fn recording_case(name: &'static str) -> OrderedCase<Log> {
        OrderedCase::new(name, move |log: Log| async move {
            log.lock().unwrap().push(name.to_string());
            CaseResult::Ok(())
        })
    }

    #[test]
    fn test_explicit_order_then_default_last() {
        let suite = OrderedSuite::new("ordering")
            .case(recording_case("save"))
            .case(recording_case("count").with_order(1))
            .case(recording_case("find").with_order(2));

        assert_eq!(suite.execution_order(), vec!["count", "find", "save"]);
    }

    #[test]
    fn test_equal_keys_keep_registration_order() {
        let suite = OrderedSuite::new("stable")
            .case(recording_case("b").with_order(5))
            .case(recording_case("a").with_order(5))
            .case(recording_case("c"))
            .case(recording_case("d"));

        assert_eq!(suite.execution_order(), vec!["b", "a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_runs_sequentially_in_order() {
        let log: Log = Arc::default();
        let report = OrderedSuite::new("sequence")
            .case(recording_case("write"))
            .case(recording_case("read").with_order(1))
            .run(log.clone())
            .await;

        assert!(report.is_success());
        assert_eq!(report.executed(), vec!["read", "write"]);
        assert_eq!(*log.lock().unwrap(), vec!["read", "write"]);
    }

    #[tokio::test]
    async fn test_panics_and_errors_are_recorded() {
        let log: Log = Arc::default();
        let report = OrderedSuite::new("failures")
            .case(OrderedCase::new("panics", panicking_case).with_order(1))
            .case(OrderedCase::new("errors", failing_case).with_order(2))
            .case(recording_case("still-runs"))
            .run(log.clone())
            .await;

        assert!(!report.is_success());
        assert_eq!(report.failures().len(), 2);
        assert_eq!(
            report.outcomes[0].status,
            CaseStatus::Panicked("boom".to_string())
        );
        assert!(matches!(report.outcomes[1].status, CaseStatus::Failed(_)));
        assert_eq!(*log.lock().unwrap(), vec!["still-runs"]);
        assert!(report.ensure_success().is_err());
    }

    #[derive(Default)]
    struct FakeHarness {
        fail_provision: bool,
        fail_teardown: bool,
        provisioned: bool,
        torn_down: bool,
        log: Log,
    }

    #[async_trait]
    impl SuiteHarness for FakeHarness {
        type Context = Log;

        async fn provision(&mut self) -> StormTrackerResult<Log> {
            if self.fail_provision {
                return Err(StormTrackerError::ProvisioningError("no docker".to_string()));
            }
            self.provisioned = true;
            Ok(self.log.clone())
        }

        async fn teardown(&mut self) -> StormTrackerResult<()> {
            self.torn_down = true;
            if self.fail_teardown {
                return Err(StormTrackerError::ProvisioningError("drop failed".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_teardown_runs_after_panicking_case() {
        let mut harness = FakeHarness::default();
        let suite = OrderedSuite::new("teardown").case(OrderedCase::new("panics", panicking_case));

        let result = run_suite(&mut harness, suite).await;
        assert!(result.is_err());
        assert!(harness.provisioned);
        assert!(harness.torn_down);
    }

    #[tokio::test]
    async fn test_setup_failure_skips_cases() {
        let mut harness = FakeHarness {
            fail_provision: true,
            ..FakeHarness::default()
        };
        let suite = OrderedSuite::new("setup").case(recording_case("never"));

        let err = run_suite(&mut harness, suite).await.unwrap_err();
        assert!(format!("{err:#}").contains("no docker"));
        assert!(harness.torn_down);
        assert!(harness.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_suite_returns_report() {
        let mut harness = FakeHarness::default();
        let suite = OrderedSuite::new("ok")
            .case(recording_case("second"))
            .case(recording_case("first").with_order(1));

        let report = run_suite(&mut harness, suite).await.unwrap();
        assert_eq!(report.executed(), vec!["first", "second"]);
        assert!(harness.torn_down);
    }

    #[tokio::test]
    async fn test_failed_teardown_keeps_case_failures() {
        let mut harness = FakeHarness {
            fail_teardown: true,
            ..FakeHarness::default()
        };
        let suite = OrderedSuite::new("s").case(OrderedCase::new("count", failing_case));

        let err = run_suite(&mut harness, suite).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(harness.torn_down);
        assert!(message.contains("drop failed"), "{message}");
        assert!(message.contains("count: failed: expected 2, got 3"), "{message}");
    }

    #[tokio::test]
    async fn test_failed_teardown_alone_is_reported() {
        let mut harness = FakeHarness {
            fail_teardown: true,
            ..FakeHarness::default()
        };
        let suite = OrderedSuite::new("s").case(recording_case("passes"));

        let err = run_suite(&mut harness, suite).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("teardown failed for suite 's'"), "{message}");
        assert!(message.contains("drop failed"), "{message}");
    }
}
