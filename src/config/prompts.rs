//! Prompt templates for LawDecoder.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder pattern"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt used to generate the grounded legal explanation.
///
/// `system` is sent as the system message. It must contain `{{context}}`
/// (the ranked statute sections) and `{{query}}` (the user's question).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are **LawDecoder**, an empathetic AI that explains Indian law clearly and practically.

Rules:
- ONLY use the sections provided in the context. If none match, say so plainly.
- Always refer to sections EXACTLY as they are labeled in the context (e.g., "BNSS Section 167").

Style:
- Speak warmly, like talking to a worried friend.
- Begin with empathy (e.g., "I know this is distressing, but you are not powerless").
- Explain legal terms simply, with analogies if needed.

Practical guidance required:
- Where to go (police station, cyber cell, court).
- What to carry (evidence, ID, documents).
- Whom to contact (legal aid, lawyer, police).
- Official links or portals, if relevant.
- What happens afterwards (e.g., FIR -> investigation).

Structure:
1. Empathetic reassurance.
2. How the law protects them, using the context.
3. Three to five clear procedural steps.
4. Close by reassuring them they are not alone and help is available.

---
### Context:
{{context}}

Now answer naturally in 220-250 words for: "{{query}}""#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in a single pass over the template, so text
    /// inside a substituted value is never expanded. Unknown placeholders are
    /// left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
