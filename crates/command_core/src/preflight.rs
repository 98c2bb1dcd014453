use plant_integration::{CheckProbe, CheckVerdict};
use rand::rngs::StdRng;
use shared::domain::{CheckId, CheckStatus, CommandDescriptor, PreflightCheck};
use tracing::{debug, warn};

use crate::{journal::RunJournal, timing::DelayRange};

/// The fixed readiness checks, in the order they are visited.
pub fn default_checks() -> Vec<PreflightCheck> {
    vec![
        PreflightCheck::pending(CheckId::Gateway, "Gateway connectivity"),
        PreflightCheck::pending(CheckId::Plc, "PLC communication"),
        PreflightCheck::pending(CheckId::Interlock, "Safety interlocks"),
        PreflightCheck::pending(CheckId::Auth, "Operator authorization"),
        PreflightCheck::pending(CheckId::Range, "Parameter range validation"),
        PreflightCheck::pending(CheckId::RateLimit, "Command rate limit"),
    ]
}

#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub checks: Vec<PreflightCheck>,
    /// First critical check that failed, if any.
    pub critical_failure: Option<CheckId>,
}

impl PreflightReport {
    pub fn has_critical_failure(&self) -> bool {
        self.critical_failure.is_some()
    }

    pub fn all_passed(&self) -> bool {
        self.checks
            .iter()
            .all(|check| check.status == CheckStatus::Passed)
    }
}

pub struct PreflightRunner<'a> {
    checks: Vec<PreflightCheck>,
    delay: DelayRange,
    rng: &'a mut StdRng,
}

impl<'a> PreflightRunner<'a> {
    pub fn new(checks: Vec<PreflightCheck>, delay: DelayRange, rng: &'a mut StdRng) -> Self {
        Self { checks, delay, rng }
    }

    /// Visits every check in order. All checks are visited even after a
    /// critical failure so the operator sees the complete picture.
    pub async fn run(
        mut self,
        descriptor: &CommandDescriptor,
        probe: &dyn CheckProbe,
        journal: &mut RunJournal,
    ) -> PreflightReport {
        let mut critical_failure = None;

        for index in 0..self.checks.len() {
            self.checks[index].status = CheckStatus::Checking;
            journal.check_updated(&self.checks[index]);

            let delay = self.delay.sample(&mut *self.rng);
            tokio::time::sleep(delay).await;

            let id = self.checks[index].id;
            let verdict = probe.probe(id, descriptor).await;
            let check = &mut self.checks[index];
            match verdict {
                CheckVerdict::Passed => {
                    check.status = CheckStatus::Passed;
                    debug!(check = %id, delay_ms = delay.as_millis() as u64, "preflight: check passed");
                    journal.check_updated(check);
                    journal.success(format!("✓ {} passed", check.label));
                }
                CheckVerdict::Failed(reason) => {
                    check.status = CheckStatus::Failed;
                    warn!(check = %id, critical = id.is_critical(), %reason, "preflight: check failed");
                    journal.check_updated(check);
                    if id.is_critical() {
                        journal.error(format!("✗ {} failed: {reason}", check.label));
                        if critical_failure.is_none() {
                            critical_failure = Some(id);
                        }
                    } else {
                        journal.warning(format!("⚠ {} failed: {reason}", check.label));
                    }
                }
            }
        }

        PreflightReport {
            checks: self.checks,
            critical_failure,
        }
    }
}

#[cfg(test)]
#[path = "tests/preflight_tests.rs"]
mod tests;
