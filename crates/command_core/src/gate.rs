use shared::domain::CommandDescriptor;

/// Trimmed override reason, or `None` when nothing but whitespace was typed.
pub fn normalized_reason(reason: &str) -> Option<&str> {
    let trimmed = reason.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Whether the execute action is available for `descriptor` given the
/// operator's current override text.
pub fn can_execute(descriptor: &CommandDescriptor, override_reason: &str) -> bool {
    !descriptor.requires_reason() || normalized_reason(override_reason).is_some()
}
