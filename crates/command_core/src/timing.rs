use std::time::Duration;

use rand::Rng;
use shared::domain::Stage;

/// Inclusive bounds for a jittered simulated delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ns = u64::try_from(self.min.as_nanos()).unwrap_or(u64::MAX);
        let max_ns = u64::try_from(self.max.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rng.gen_range(min_ns..=max_ns))
    }
}

#[derive(Debug, Clone)]
pub struct PipelineTimings {
    pub preflight_check: DelayRange,
    pub authorization: Duration,
    pub transmission: Duration,
    pub gateway: Duration,
    pub plc: Duration,
    pub equipment: Duration,
    pub verification: Duration,
    /// Seeds the delay jitter; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for PipelineTimings {
    fn default() -> Self {
        Self {
            preflight_check: DelayRange::from_millis(350, 500),
            authorization: Duration::from_millis(800),
            transmission: Duration::from_millis(1000),
            gateway: Duration::from_millis(800),
            plc: Duration::from_millis(1200),
            equipment: Duration::from_millis(1500),
            verification: Duration::from_millis(1000),
            seed: None,
        }
    }
}

impl PipelineTimings {
    /// No waiting at all; used by tooling that only wants the transcript.
    pub fn instant() -> Self {
        Self {
            preflight_check: DelayRange::fixed(Duration::ZERO),
            authorization: Duration::ZERO,
            transmission: Duration::ZERO,
            gateway: Duration::ZERO,
            plc: Duration::ZERO,
            equipment: Duration::ZERO,
            verification: Duration::ZERO,
            seed: Some(0),
        }
    }

    /// Simulated work time of a dispatch stage. Review, preflight (timed per
    /// check) and complete have none.
    pub fn stage_delay(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Authorization => self.authorization,
            Stage::Transmission => self.transmission,
            Stage::Gateway => self.gateway,
            Stage::Plc => self.plc,
            Stage::Equipment => self.equipment,
            Stage::Verification => self.verification,
            Stage::Review | Stage::Preflight | Stage::Complete => Duration::ZERO,
        }
    }

    pub fn set_stage_delay(&mut self, stage: Stage, delay: Duration) {
        match stage {
            Stage::Authorization => self.authorization = delay,
            Stage::Transmission => self.transmission = delay,
            Stage::Gateway => self.gateway = delay,
            Stage::Plc => self.plc = delay,
            Stage::Equipment => self.equipment = delay,
            Stage::Verification => self.verification = delay,
            Stage::Review | Stage::Preflight | Stage::Complete => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn sampled_delay_stays_within_bounds() {
        let range = DelayRange::from_millis(350, 500);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let delay = range.sample(&mut rng);
            assert!(delay >= Duration::from_millis(350));
            assert!(delay <= Duration::from_millis(500));
        }
    }

    #[test]
    fn sub_millisecond_bounds_are_honoured() {
        let range = DelayRange::new(Duration::from_nanos(100), Duration::from_nanos(900));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let delay = range.sample(&mut rng);
            assert!(delay >= Duration::from_nanos(100));
            assert!(delay <= Duration::from_nanos(900));
        }
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let range = DelayRange::from_millis(500, 350);
        assert_eq!(range.min(), Duration::from_millis(350));
        assert_eq!(range.max(), Duration::from_millis(500));
    }

    #[test]
    fn only_dispatch_stages_have_delays() {
        let timings = PipelineTimings::default();
        assert_eq!(timings.stage_delay(Stage::Review), Duration::ZERO);
        assert_eq!(timings.stage_delay(Stage::Complete), Duration::ZERO);
        assert_eq!(timings.stage_delay(Stage::Plc), Duration::from_millis(1200));
    }
}
