//! System prompt resolution for personas.

use confab_types::error::ChatError;
use confab_types::persona::BuiltinPersona;

/// Resolve the system prompt for a turn.
///
/// Built-in personas always use their fixed prompt and ignore
/// `custom_prompt`. Every other persona name, including `Custom`, needs a
/// non-blank custom prompt.
pub fn resolve_system_prompt(
    persona: &str,
    custom_prompt: Option<&str>,
) -> Result<String, ChatError> {
    if let Some(builtin) = BuiltinPersona::lookup(persona) {
        return Ok(builtin.system_prompt().to_string());
    }

    match custom_prompt.map(str::trim) {
        Some(prompt) if !prompt.is_empty() => Ok(prompt.to_string()),
        _ => Err(ChatError::InvalidPersonaPrompt {
            persona: persona.to_string(),
        }),
    }
}
