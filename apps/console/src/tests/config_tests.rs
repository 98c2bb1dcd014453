use super::{apply_env, apply_file, load_settings, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use shared::domain::Stage;

#[test]
fn defaults_match_simulated_page_timings() {
    let settings = Settings::default();
    assert_eq!(
        settings.timings.preflight_check.min(),
        Duration::from_millis(350)
    );
    assert_eq!(
        settings.timings.preflight_check.max(),
        Duration::from_millis(500)
    );
    assert_eq!(settings.failure_rate, 0.0);
}

#[test]
fn file_overrides_nested_tables() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
operator = "shift-lead"
failure_rate = 0.25
seed = 42

[preflight]
min_delay_ms = 10

[stages]
plc_ms = 5
"#,
    )
    .expect("apply file");

    assert_eq!(settings.operator, "shift-lead");
    assert_eq!(settings.failure_rate, 0.25);
    assert_eq!(settings.seed, Some(42));
    assert_eq!(
        settings.timings.preflight_check.min(),
        Duration::from_millis(10)
    );
    assert_eq!(
        settings.timings.preflight_check.max(),
        Duration::from_millis(500)
    );
    assert_eq!(settings.timings.stage_delay(Stage::Plc), Duration::from_millis(5));
    assert_eq!(
        settings.timings.stage_delay(Stage::Gateway),
        Duration::from_millis(800)
    );
}

#[test]
fn malformed_file_is_an_error() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "failure_rate = \"often\"").expect_err("should fail");
}

#[test]
fn env_overrides_file_values() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "operator = \"from-file\"").expect("apply file");

    let vars: HashMap<&str, &str> = HashMap::from([
        ("AQUAFLOW__OPERATOR", "from-env"),
        ("AQUAFLOW__STAGE_DELAY_MS", "0"),
        ("AQUAFLOW__PREFLIGHT_MAX_DELAY_MS", "1"),
        ("AQUAFLOW__PREFLIGHT_MIN_DELAY_MS", "0"),
        ("AQUAFLOW__SEED", "not-a-number"),
    ]);
    apply_env(&mut settings, |key| vars.get(key).map(|v| v.to_string())).expect("apply env");

    assert_eq!(settings.operator, "from-env");
    assert_eq!(settings.seed, None);
    assert_eq!(
        settings.timings.stage_delay(Stage::Equipment),
        Duration::ZERO
    );
    assert_eq!(
        settings.timings.preflight_check.max(),
        Duration::from_millis(1)
    );
}

#[test]
fn pipeline_options_carry_seed_and_operator() {
    let settings = Settings {
        operator: "night-shift".into(),
        seed: Some(7),
        ..Settings::default()
    };
    let options = settings.pipeline_options();
    assert_eq!(options.operator, "night-shift");
    assert_eq!(options.timings.seed, Some(7));
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("aquaflow_missing_{suffix}.toml"));
    load_settings(Some(&path)).expect_err("missing file");
}

#[test]
fn explicit_config_file_is_loaded() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("aquaflow_config_{suffix}.toml"));
    fs::write(&path, "event_capacity = 32\n").expect("write config");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.event_capacity, 32);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn non_finite_failure_rate_in_file_is_rejected() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "failure_rate = nan").expect_err("nan rate");
    apply_file(&mut settings, "failure_rate = inf").expect_err("infinite rate");
    apply_file(&mut settings, "failure_rate = 1.5").expect_err("rate above one");
    assert_eq!(settings.failure_rate, 0.0);
}

#[test]
fn non_finite_failure_rate_in_env_is_rejected() {
    for raw in ["NaN", "inf", "-0.1", "often"] {
        let mut settings = Settings::default();
        let err = apply_env(&mut settings, |key| {
            (key == "AQUAFLOW__FAILURE_RATE").then(|| raw.to_string())
        })
        .expect_err("invalid rate");
        assert!(err.to_string().contains("FAILURE_RATE"), "{err}");
        assert_eq!(settings.failure_rate, 0.0);
    }
}

#[test]
fn event_capacity_is_bounded() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "event_capacity = 0").expect_err("zero capacity");
    apply_file(&mut settings, &format!("event_capacity = {}", u32::MAX))
        .expect_err("huge capacity");

    let mut settings = Settings::default();
    apply_env(&mut settings, |key| {
        (key == "AQUAFLOW__EVENT_CAPACITY").then(|| "9223372036854775807".to_string())
    })
    .expect_err("huge capacity from env");
    assert_eq!(settings.event_capacity, 256);
}
