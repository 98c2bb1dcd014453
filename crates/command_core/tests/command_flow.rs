use std::sync::Arc;

use command_core::{
    command_url, CommandPipeline, IntakeError, IntakeState, PipelineOptions, PipelineTimings,
    RunOutcome,
};
use plant_integration::InMemoryCommandBackend;
use shared::domain::{CommandStatus, LogLevel, Stage};

const PUMP_A: &str = r#"{"equipmentId":"pump-a","equipmentName":"Pump A","plantId":"north","plantName":"North Plant","parameterName":"Discharge Pressure","riskLevel":"critical","currentValue":10,"targetValue":12,"unit":"bar","source":"alarm_response","rootCause":"Low header pressure"}"#;

fn location() -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("data", PUMP_A)
        .finish();
    format!("/command-execution?{query}")
}

#[tokio::test(start_paused = true)]
async fn url_to_result_with_in_memory_backend() {
    let descriptor = match IntakeState::from_location(&location()) {
        IntakeState::Ready(descriptor) => descriptor,
        IntakeState::NoCommandData(err) => panic!("intake failed: {err}"),
    };
    assert_eq!(descriptor.root_cause.as_deref(), Some("Low header pressure"));

    let backend = Arc::new(InMemoryCommandBackend::new());
    let mut pipeline = CommandPipeline::new(
        descriptor,
        backend.clone(),
        PipelineOptions {
            timings: PipelineTimings {
                seed: Some(3),
                ..PipelineTimings::default()
            },
            ..PipelineOptions::default()
        },
    );
    assert!(!pipeline.can_execute());
    pipeline.set_override_reason("Header pressure below minimum for 20 minutes");

    let report = pipeline.execute().await.expect("run");

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.stages_visited, Stage::ORDER.to_vec());
    assert!(report.result.success, "{}", report.result.message);

    let command_id = report.result.command_id.expect("command id");
    let stored = backend.command(command_id).await.expect("stored command");
    assert_eq!(stored.status, CommandStatus::Completed);
    assert_eq!(
        stored.override_reason.as_deref(),
        Some("Header pressure below minimum for 20 minutes")
    );
    assert_eq!(
        report.log.last().map(|entry| entry.level),
        Some(LogLevel::Success)
    );
}

#[tokio::test(start_paused = true)]
async fn failing_backend_renders_failure_without_error() {
    let descriptor = IntakeState::from_location(&location())
        .descriptor()
        .cloned()
        .expect("descriptor");
    let backend = Arc::new(InMemoryCommandBackend::with_failure_rate(1.0, Some(9)));
    let mut pipeline = CommandPipeline::new(descriptor, backend, PipelineOptions::default());
    pipeline.set_override_reason("manual test");

    let report = pipeline.execute().await.expect("run");

    assert_eq!(report.final_stage, Stage::Complete);
    assert!(!report.result.success);
}

#[test]
fn missing_or_broken_data_never_yields_a_descriptor() {
    for location in [
        "/command-execution",
        "/command-execution?data=",
        "/command-execution?data=%7Bnot-json",
        "/command-execution?data=null",
    ] {
        let state = IntakeState::from_location(location);
        assert!(state.descriptor().is_none(), "{location}");
    }
}

#[test]
fn generated_url_round_trips_through_intake() {
    let descriptor = IntakeState::from_location(&location())
        .descriptor()
        .cloned()
        .expect("descriptor");
    let url = command_url("https://aquaflow.example/command-execution", &descriptor).expect("url");

    match IntakeState::from_location(url.as_str()) {
        IntakeState::Ready(decoded) => assert_eq!(decoded, descriptor),
        IntakeState::NoCommandData(err) => panic!("unexpected intake error: {err}"),
    }
    assert!(matches!(
        command_url("not a url", &descriptor),
        Err(IntakeError::InvalidUrl(_))
    ));
}
