//! Prompt assembly for the relatedness judge.

use std::borrow::Cow;
use std::fmt::Write as _;

use knot_core::config::{ContrastiveConfig, ContrastiveExample};

const ELLIPSIS: &str = "...";

/// Placeholders recognised in a prompt template.
const PLACEHOLDERS: [&str; 3] = ["{examples}", "{text_a}", "{text_b}"];

/// Cut `text` to at most `max_chars` characters, backing off to the last
/// whitespace so words are not split, and append `...` when anything was cut.
///
/// ```
/// use knot_infer::contrastive::truncate_on_word_boundary;
///
/// assert_eq!(truncate_on_word_boundary("short", 10), "short");
/// assert_eq!(truncate_on_word_boundary("login page crashes", 12), "login page...");
/// ```
#[must_use]
pub fn truncate_on_word_boundary(text: &str, max_chars: usize) -> Cow<'_, str> {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return Cow::Borrowed(text);
    };
    let head = &text[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    Cow::Owned(format!("{}{ELLIPSIS}", head.trim_end()))
}

/// Render the example bank as numbered worked pairs.
#[must_use]
pub fn render_examples(examples: &[ContrastiveExample], max_chars: usize) -> String {
    let mut out = String::new();
    for (n, example) in examples.iter().enumerate() {
        if n > 0 {
            out.push('\n');
        }
        let answer = if example.related { "RELATED" } else { "NOT_RELATED" };
        let _ = writeln!(out, "Example {}:", n + 1);
        let _ = writeln!(
            out,
            "Record A: {}",
            truncate_on_word_boundary(example.text_a.trim(), max_chars)
        );
        let _ = writeln!(
            out,
            "Record B: {}",
            truncate_on_word_boundary(example.text_b.trim(), max_chars)
        );
        let _ = writeln!(out, "Answer: {answer}");
        if let Some(rationale) = example.rationale.as_deref().filter(|r| !r.trim().is_empty()) {
            let _ = writeln!(out, "Why: {}", rationale.trim());
        }
    }
    out.trim_end().to_string()
}

/// A template with its example bank already rendered, ready to fill for
/// many pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    examples: String,
    max_chars: usize,
}

impl PromptTemplate {
    #[must_use]
    pub fn from_config(config: &ContrastiveConfig) -> Self {
        let max_chars = config.llm.max_text_chars;
        Self {
            template: config.prompt_template.clone(),
            examples: render_examples(&config.examples, max_chars),
            max_chars,
        }
    }

    /// The rendered example bank substituted for `{examples}`.
    #[must_use]
    pub fn examples(&self) -> &str {
        &self.examples
    }

    /// Fill the template for one pair.
    ///
    /// Substitution is a single left-to-right pass, so placeholder text
    /// inside a record is never expanded a second time.
    #[must_use]
    pub fn render(&self, text_a: &str, text_b: &str) -> String {
        let a = truncate_on_word_boundary(text_a.trim(), self.max_chars);
        let b = truncate_on_word_boundary(text_b.trim(), self.max_chars);
        let values: [&str; 3] = [&self.examples, &a, &b];

        let mut out =
            String::with_capacity(self.template.len() + self.examples.len() + a.len() + b.len());
        let mut rest = self.template.as_str();
        while !rest.is_empty() {
            let next = PLACEHOLDERS
                .iter()
                .zip(values)
                .filter_map(|(ph, value)| rest.find(ph).map(|at| (at, *ph, value)))
                .min_by_key(|(at, _, _)| *at);
            let Some((at, placeholder, value)) = next else {
                out.push_str(rest);
                break;
            };
            out.push_str(&rest[..at]);
            out.push_str(value);
            rest = &rest[at + placeholder.len()..];
        }
        out
    }
}

/// Fill the template for a single pair. Use [`PromptTemplate`] when
/// prompting for many pairs with the same config.
#[must_use]
pub fn build_prompt(config: &ContrastiveConfig, text_a: &str, text_b: &str) -> String {
    PromptTemplate::from_config(config).render(text_a, text_b)
}
