// Terminal strings and small formatters. ASCII-only.

use providers::groq::models::ModelInfo;
use tutor_core::modes::{Mode, ModeSelection, QueryMetadata};

pub const PREFIX_USER: &str = "| ";
pub const PREFIX_ASSISTANT: &str = "> ";

pub const HELP: &str = "\
Commands:
  /mode <socratic|inventor|explainer|default>   switch learning mode
  /level <beginner|intermediate|advanced|off>   explanation depth (explainer)
  /project <web|mobile|data|hardware|ai_ml|general|off>   project focus (inventor)
  /context <text|off>                           extra context for the prompt
  /session                                      show session statistics
  /help                                         this help
  /quit                                         leave
Ctrl-C stops the current reply; at the prompt it quits.";

pub fn banner(selection: &ModeSelection, streaming: bool) -> String {
    format!(
        "tutor chat ({}; {}). Type /help for commands.",
        describe_selection(selection),
        if streaming { "streaming" } else { "batch" }
    )
}

pub fn describe_selection(selection: &ModeSelection) -> String {
    let mut s = format!("mode={}", selection.mode);
    if let Some(level) = selection.complexity {
        s.push_str(&format!(" level={}", level));
    }
    if let Some(p) = selection.project_type {
        s.push_str(&format!(" project={}", p));
    }
    if selection.extra_context.is_some() {
        s.push_str(" +context");
    }
    s
}

pub fn format_suggestions(suggestions: &[String]) -> String {
    let mut out = String::new();
    for s in suggestions {
        out.push_str("  - ");
        out.push_str(s);
        out.push('\n');
    }
    out
}

pub fn format_metadata(meta: &QueryMetadata) -> String {
    format!("[{} | {} tokens]", meta.model, meta.tokens_used)
}

pub fn format_mode(mode: Mode) -> String {
    let d = mode.describe();
    format!(
        "{:<10} {}\n           best for: {}\n           approach: {}",
        mode.as_str(),
        d.description,
        d.best_for,
        d.approach
    )
}

pub fn format_model(m: &ModelInfo) -> String {
    format!(
        "{:<26} {:>6} ctx  {}",
        m.id, m.context_window, m.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::modes::{ComplexityLevel, ProjectType};

    #[test]
    fn selection_summary() {
        let sel = ModeSelection::new(Mode::Explainer).with_complexity(ComplexityLevel::Advanced);
        assert_eq!(describe_selection(&sel), "mode=explainer level=advanced");
        let sel = ModeSelection::new(Mode::Inventor)
            .with_project_type(ProjectType::AiMl)
            .with_context("robotics club");
        assert_eq!(describe_selection(&sel), "mode=inventor project=ai_ml +context");
    }

    #[test]
    fn suggestions_as_bullets() {
        let out = format_suggestions(&["one".to_string(), "two".to_string()]);
        assert_eq!(out, "  - one\n  - two\n");
    }
}
