use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use command_core::{journal::MAX_EVENT_CAPACITY, DelayRange, PipelineOptions, PipelineTimings};
use serde::Deserialize;
use shared::domain::Stage;

const DEFAULT_CONFIG_FILE: &str = "aquaflow.toml";
const DISPATCH_STAGES: [Stage; 6] = [
    Stage::Authorization,
    Stage::Transmission,
    Stage::Gateway,
    Stage::Plc,
    Stage::Equipment,
    Stage::Verification,
];

#[derive(Debug, Clone)]
pub struct Settings {
    pub log_filter: String,
    pub operator: String,
    pub failure_rate: f64,
    pub seed: Option<u64>,
    pub event_capacity: usize,
    pub timings: PipelineTimings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "warn".into(),
            operator: "operator".into(),
            failure_rate: 0.0,
            seed: None,
            event_capacity: 256,
            timings: PipelineTimings::default(),
        }
    }
}

impl Settings {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            timings: PipelineTimings {
                seed: self.seed,
                ..self.timings.clone()
            },
            operator: self.operator.clone(),
            event_capacity: self.event_capacity,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    log_filter: Option<String>,
    operator: Option<String>,
    failure_rate: Option<f64>,
    seed: Option<u64>,
    event_capacity: Option<usize>,
    #[serde(default)]
    preflight: PreflightFileSettings,
    #[serde(default)]
    stages: StageFileSettings,
}

#[derive(Debug, Default, Deserialize)]
struct PreflightFileSettings {
    min_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StageFileSettings {
    authorization_ms: Option<u64>,
    transmission_ms: Option<u64>,
    gateway_ms: Option<u64>,
    plc_ms: Option<u64>,
    equipment_ms: Option<u64>,
    verification_ms: Option<u64>,
}

impl StageFileSettings {
    fn delay_for(&self, stage: Stage) -> Option<u64> {
        match stage {
            Stage::Authorization => self.authorization_ms,
            Stage::Transmission => self.transmission_ms,
            Stage::Gateway => self.gateway_ms,
            Stage::Plc => self.plc_ms,
            Stage::Equipment => self.equipment_ms,
            Stage::Verification => self.verification_ms,
            Stage::Review | Stage::Preflight | Stage::Complete => None,
        }
    }
}

/// Defaults, then the config file, then `AQUAFLOW__*` environment variables.
/// An explicitly requested file must exist; the default file is optional.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match explicit_path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        apply_file(&mut settings, &raw)?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw).context("invalid config file")?;

    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.operator {
        settings.operator = v;
    }
    if let Some(v) = file_cfg.failure_rate {
        settings.failure_rate = checked_failure_rate(v).context("invalid config file")?;
    }
    if let Some(v) = file_cfg.seed {
        settings.seed = Some(v);
    }
    if let Some(v) = file_cfg.event_capacity {
        settings.event_capacity = checked_event_capacity(v).context("invalid config file")?;
    }
    set_preflight_bounds(
        settings,
        file_cfg.preflight.min_delay_ms,
        file_cfg.preflight.max_delay_ms,
    );
    for stage in DISPATCH_STAGES {
        if let Some(ms) = file_cfg.stages.delay_for(stage) {
            settings
                .timings
                .set_stage_delay(stage, Duration::from_millis(ms));
        }
    }
    Ok(())
}

pub(crate) fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("AQUAFLOW__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("AQUAFLOW__OPERATOR") {
        settings.operator = v;
    }
    if let Some(v) = lookup("AQUAFLOW__FAILURE_RATE") {
        let parsed = v
            .parse::<f64>()
            .with_context(|| format!("AQUAFLOW__FAILURE_RATE is not a number: '{v}'"))?;
        settings.failure_rate =
            checked_failure_rate(parsed).context("invalid AQUAFLOW__FAILURE_RATE")?;
    }
    if let Some(v) = lookup("AQUAFLOW__EVENT_CAPACITY") {
        let parsed = v
            .parse::<usize>()
            .with_context(|| format!("AQUAFLOW__EVENT_CAPACITY is not a number: '{v}'"))?;
        settings.event_capacity =
            checked_event_capacity(parsed).context("invalid AQUAFLOW__EVENT_CAPACITY")?;
    }
    if let Some(v) = lookup("AQUAFLOW__SEED") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.seed = Some(parsed);
        }
    }
    let min = lookup("AQUAFLOW__PREFLIGHT_MIN_DELAY_MS").and_then(|v| v.parse::<u64>().ok());
    let max = lookup("AQUAFLOW__PREFLIGHT_MAX_DELAY_MS").and_then(|v| v.parse::<u64>().ok());
    set_preflight_bounds(settings, min, max);

    if let Some(ms) = lookup("AQUAFLOW__STAGE_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
        for stage in DISPATCH_STAGES {
            settings
                .timings
                .set_stage_delay(stage, Duration::from_millis(ms));
        }
    }
    Ok(())
}

fn checked_failure_rate(rate: f64) -> anyhow::Result<f64> {
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        bail!("failure_rate must be between 0.0 and 1.0, got {rate}");
    }
    Ok(rate)
}

fn checked_event_capacity(capacity: usize) -> anyhow::Result<usize> {
    if capacity == 0 || capacity > MAX_EVENT_CAPACITY {
        bail!("event_capacity must be between 1 and {MAX_EVENT_CAPACITY}, got {capacity}");
    }
    Ok(capacity)
}

fn set_preflight_bounds(settings: &mut Settings, min_ms: Option<u64>, max_ms: Option<u64>) {
    if min_ms.is_none() && max_ms.is_none() {
        return;
    }
    let current = settings.timings.preflight_check;
    let min = min_ms.map(Duration::from_millis).unwrap_or(current.min());
    let max = max_ms.map(Duration::from_millis).unwrap_or(current.max());
    settings.timings.preflight_check = DelayRange::new(min, max);
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
