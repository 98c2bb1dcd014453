use super::*;
use shared::domain::{CommandSource, RiskLevel};

const PUMP_A: &str = r#"{"equipmentName":"Pump A","riskLevel":"critical","currentValue":10,"targetValue":12,"unit":"bar"}"#;

fn encoded(json: &str) -> String {
    form_urlencoded::byte_serialize(json.as_bytes()).collect()
}

#[test]
fn decodes_descriptor_from_absolute_url() {
    let location = format!(
        "https://aquaflow.example/command-execution?data={}",
        encoded(PUMP_A)
    );
    let descriptor = command_from_location(&location).expect("descriptor");
    assert_eq!(descriptor.equipment_name, "Pump A");
    assert_eq!(descriptor.risk_level, RiskLevel::Critical);
    assert_eq!(descriptor.target_value, 12.0);
    assert_eq!(descriptor.unit, "bar");
}

#[test]
fn decodes_descriptor_from_relative_location() {
    let location = format!("/command-execution?tab=review&data={}", encoded(PUMP_A));
    let descriptor = command_from_location(&location).expect("descriptor");
    assert_eq!(descriptor.current_value, Some(10.0));
}

#[test]
fn accepts_bare_query_with_or_without_question_mark() {
    let query = format!("data={}", encoded(PUMP_A));
    assert!(command_from_query(&query).is_ok());
    assert!(command_from_query(&format!("?{query}")).is_ok());
}

#[test]
fn missing_parameter_is_no_command_data() {
    let state = IntakeState::from_location("/command-execution?tab=review");
    assert!(matches!(
        state,
        IntakeState::NoCommandData(IntakeError::MissingData)
    ));
    assert!(state.descriptor().is_none());
}

#[test]
fn empty_parameter_is_no_command_data() {
    let state = IntakeState::from_query("data=");
    assert!(matches!(
        state,
        IntakeState::NoCommandData(IntakeError::MissingData)
    ));
}

#[test]
fn malformed_json_is_no_command_data() {
    let query = format!("data={}", encoded("{equipmentName: Pump A"));
    let state = IntakeState::from_query(&query);
    assert!(matches!(
        state,
        IntakeState::NoCommandData(IntakeError::InvalidJson(_))
    ));
}

#[test]
fn incomplete_payload_is_no_command_data() {
    let query = format!("data={}", encoded(r#"{"equipmentName":"Pump A"}"#));
    let state = IntakeState::from_query(&query);
    assert!(matches!(
        state,
        IntakeState::NoCommandData(IntakeError::InvalidPayload(_))
    ));
}

#[test]
fn command_url_is_read_back_by_intake() {
    let descriptor = command_from_query(&format!("data={}", encoded(PUMP_A))).expect("descriptor");
    let url = command_url("https://aquaflow.example/command-execution", &descriptor).expect("url");
    assert!(url.as_str().contains("data="));

    let decoded = command_from_location(url.as_str()).expect("decoded");
    assert_eq!(decoded, descriptor);
    assert_eq!(decoded.source, CommandSource::Manual);
}
