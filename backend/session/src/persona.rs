//! The fixed system instruction every conversation is started with.

use std::sync::Arc;

/// Built-in scheduling assistant persona.
pub const SCHEDULING_PERSONA: &str = "\
You are an expert AI Scheduling Assistant. Your primary goal is to help the user manage their time, \
schedule appointments, resolve calendar conflicts, and optimize their daily routines.

Follow these rules:
1. Always be polite, highly organized, and concise.
2. When asked to schedule an event, clearly confirm the Date, Time, Duration, and Title.
3. If the user provides overlapping events, proactively point out the conflict and suggest alternative times.
4. Format your responses using markdown (bullet points, bold text for times/dates) to make them easy to read.
";

/// A persona is fixed for the life of the process; clones share the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    instruction: Arc<str>,
}

impl Persona {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: Arc::from(instruction.into()),
        }
    }

    pub fn scheduling() -> Self {
        Self::new(SCHEDULING_PERSONA)
    }

    /// Use `custom` when configured, the scheduling persona otherwise.
    pub fn from_override(custom: Option<String>) -> Self {
        match custom {
            Some(text) if !text.trim().is_empty() => Self::new(text),
            _ => Self::scheduling(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::scheduling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_or_default() {
        assert_eq!(Persona::from_override(None), Persona::scheduling());
        assert_eq!(Persona::from_override(Some("  ".into())), Persona::scheduling());
        assert_eq!(
            Persona::from_override(Some("Be brief.".into())).instruction(),
            "Be brief."
        );
        assert!(Persona::default().instruction().contains("Date, Time, Duration, and Title"));
    }
}
