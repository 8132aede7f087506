//! Plain-text transcript rendering for conversation export.

use confab_types::conversation::{Message, Role};

/// Render a thread as a downloadable transcript.
///
/// Layout: a `Character: {persona}` header, then one `"{Role}: {content}"`
/// block per message, blocks separated by a blank line.
pub fn render_transcript(persona: &str, messages: &[Message]) -> String {
    let mut out = format!("Character: {persona}\n\n");
    for message in messages {
        let label = match message.role {
            Role::Human => "Human",
            Role::Ai => "Ai",
        };
        out.push_str(label);
        out.push_str(": ");
        out.push_str(&message.content);
        out.push_str("\n\n");
    }
    out
}
