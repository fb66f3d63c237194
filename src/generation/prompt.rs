//! Prompt assembly shared by every tier.

/// Default persona for the assistant on the other end of the serial line.
pub const PERSONA: &str = "You are ArmGPT, a friendly and knowledgeable AI assistant connected to an Acorn computer via serial port. You have a warm, gentle personality and enjoy helping Acorn enthusiasts with their computing needs.

Key traits:
- Always introduce yourself as ArmGPT when greeting users
- Be enthusiastic about retro computing and Acorn computers
- Keep responses as SHORT as possible - aim for 1-2 sentences, maximum 2 short paragraphs only when absolutely necessary
- Use a conversational, amicable tone
- Show interest in what the user is working on
- If asked about yourself, mention you're running on a Raspberry Pi connected to their Acorn

IMPORTANT: Be concise! Serial terminals are limited. Give complete but brief answers.

Remember: You're not generic customer support - you're ArmGPT, a specialized companion for Acorn computer users!";

/// Added ahead of retrieved context.
pub const GROUNDING_NOTE: &str = "You also have access to ARM history documentation. Use the context below to ground your answers when relevant. If the context doesn't cover the question, you can still answer from general knowledge, but let the user know you're going beyond your documentation.";

pub const CONTEXT_HEADER: &str = "--- Retrieved Context ---";

/// Everything a tier needs to produce one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub system_preamble: String,
    pub retrieved_context: Option<String>,
    pub user_text: String,
}

impl PromptContext {
    /// Empty or whitespace-only context is treated as no context.
    pub fn new(
        system_preamble: impl Into<String>,
        retrieved_context: Option<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            system_preamble: system_preamble.into(),
            retrieved_context: retrieved_context.filter(|c| !c.trim().is_empty()),
            user_text: user_text.into(),
        }
    }

    /// Preamble, plus grounding note and context block when context exists.
    pub fn system_message(&self) -> String {
        match &self.retrieved_context {
            Some(context) => format!(
                "{}\n\n{GROUNDING_NOTE}\n\n{CONTEXT_HEADER}\n{context}",
                self.system_preamble
            ),
            None => self.system_preamble.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_context_is_just_the_preamble() {
        let prompt = PromptContext::new("persona", None, "hi");
        assert_eq!(prompt.system_message(), "persona");
    }

    #[test]
    fn persona_closes_with_companion_reminder() {
        assert!(PERSONA.starts_with("You are ArmGPT"));
        assert!(PERSONA.ends_with("a specialized companion for Acorn computer users!"));
    }

    #[test]
    fn blank_context_is_dropped() {
        let prompt = PromptContext::new("persona", Some("  \n".into()), "hi");
        assert!(prompt.retrieved_context.is_none());
        assert_eq!(prompt.system_message(), "persona");
    }

    #[test]
    fn context_is_grounded_and_labeled() {
        let prompt = PromptContext::new("persona", Some("[a.txt]\nAcorn".into()), "who built ARM?");
        let system = prompt.system_message();
        assert!(system.starts_with("persona\n\n"));
        assert!(system.contains(GROUNDING_NOTE));
        assert!(system.ends_with("--- Retrieved Context ---\n[a.txt]\nAcorn"));
        assert_eq!(prompt.user_text, "who built ARM?");
    }
}
