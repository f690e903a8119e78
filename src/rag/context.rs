//! Grounded prompt composition.

use crate::config::Prompts;
use crate::retrieval::ScoredEntry;
use std::collections::HashMap;

/// Separator placed between sections in the context block.
pub const SECTION_DELIMITER: &str = "\n\n---\n\n";

/// Marker used when a section has no chapter.
pub const NO_CHAPTER: &str = "N/A";

/// Format ranked sections for the prompt, highest similarity first.
pub fn format_context_for_prompt(sections: &[ScoredEntry]) -> String {
    sections
        .iter()
        .map(|s| {
            format!(
                "From the Act: {}\nSection: {}\nChapter: {}\n\n{}",
                s.entry.law_name,
                s.entry.title,
                s.entry.chapter.as_deref().unwrap_or(NO_CHAPTER),
                s.entry.content
            )
        })
        .collect::<Vec<_>>()
        .join(SECTION_DELIMITER)
}

/// Format ranked sections for display to the user.
pub fn format_context_for_display(sections: &[ScoredEntry]) -> String {
    sections
        .iter()
        .map(|s| {
            format!(
                "{} | {} (score: {:.2})",
                s.entry.law_name, s.entry.title, s.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the system prompt from the answer template.
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    prompts: Prompts,
}

impl PromptComposer {
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }

    /// Fill the template's `{{context}}` and `{{query}}` slots.
    pub fn compose(&self, query: &str, sections: &[ScoredEntry]) -> String {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context_for_prompt(sections));
        vars.insert("query".to_string(), query.to_string());

        self.prompts
            .render_with_custom(&self.prompts.answer.system, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnswerPrompts;
    use crate::corpus::test_entry;

    fn scored(id: &str, title: &str, chapter: Option<&str>, score: f32) -> ScoredEntry {
        let mut entry = test_entry(id, title, vec![1.0]);
        entry.chapter = chapter.map(str::to_string);
        ScoredEntry { entry, score }
    }

    #[test]
    fn test_context_block_format() {
        let sections = vec![
            scored("a", "173. Information in cognizable cases", Some("CHAPTER XIII"), 0.9),
            scored("b", "303. Theft", None, 0.8),
        ];

        let context = format_context_for_prompt(&sections);

        assert_eq!(
            context,
            "From the Act: The Bharatiya Nagarik Suraksha Sanhita, 2023\n\
             Section: 173. Information in cognizable cases\n\
             Chapter: CHAPTER XIII\n\n\
             173. Information in cognizable cases content\
             \n\n---\n\n\
             From the Act: The Bharatiya Nagarik Suraksha Sanhita, 2023\n\
             Section: 303. Theft\n\
             Chapter: N/A\n\n\
             303. Theft content"
        );
    }

    #[test]
    fn test_compose_substitutes_context_and_query() {
        let composer = PromptComposer::new(Prompts {
            answer: AnswerPrompts {
                system: "CTX[{{context}}] Q[{{query}}]".to_string(),
            },
            ..Prompts::default()
        });

        let prompt = composer.compose("what now?", &[scored("a", "Title", None, 0.5)]);

        assert!(prompt.starts_with("CTX[From the Act:"));
        assert!(prompt.ends_with("Q[what now?]"));
    }

    #[test]
    fn test_query_placeholders_stay_literal() {
        let composer = PromptComposer::default();
        let sections = [scored("a", "303. Theft", None, 0.8)];

        for _ in 0..32 {
            let prompt = composer.compose("what is {{context}}?", &sections);
            assert_eq!(prompt.matches("Section: 303. Theft").count(), 1);
            assert!(prompt.contains("\"what is {{context}}?\""));
        }
    }

    #[test]
    fn test_default_template_keeps_rank_order() {
        let composer = PromptComposer::default();
        let prompt = composer.compose(
            "my phone was stolen",
            &[
                scored("first", "First section", None, 0.9),
                scored("second", "Second section", None, 0.4),
            ],
        );

        let first = prompt.find("Section: First section").unwrap();
        let second = prompt.find("Section: Second section").unwrap();
        assert!(first < second);
        assert!(prompt.contains("\"my phone was stolen\""));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_display_format() {
        let text = format_context_for_display(&[scored("a", "303. Theft", None, 0.8123)]);
        assert_eq!(
            text,
            "The Bharatiya Nagarik Suraksha Sanhita, 2023 | 303. Theft (score: 0.81)"
        );
    }
}
