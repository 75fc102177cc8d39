//! Wikitext → plain prose.
//!
//! Rules run in a fixed order:
//!
//! 1. `{{senseid|..}}` is removed (the parser reads it separately)
//! 2. `{{lb|..}}` context labels are removed
//! 3. `{{ux|..}}`, `{{syn|..}}`, `{{ant|..}}`, `{{cot|..}}` become their last argument
//! 4. every other template is removed
//! 5. `[[target|display]]` becomes `display`
//! 6. `[[target]]` becomes `target`
//! 7. `'''` and `''` emphasis is stripped
//! 8. HTML-like tags are stripped
//! 9. whitespace is collapsed and trimmed
//!
//! Rules 1-4 are one pass of the template scanner, which keeps nested braces
//! balanced. The full sequence is repeated until the text stops changing, so
//! markup that only forms once an inner piece is removed still goes away and
//! `normalize` is idempotent.

use crate::template::{rewrite_templates, Template};
use lazy_static::lazy_static;
use regex::Regex;

pub const SENSE_ID_TEMPLATE: &str = "senseid";
pub const EXAMPLE_TEMPLATE: &str = "ux";

/// Templates that wrap readable text: `{{name|lang|...|payload}}`.
const WRAPPER_TEMPLATES: &[&str] = &[EXAMPLE_TEMPLATE, "syn", "ant", "cot"];

lazy_static! {
    static ref PIPED_LINK: Regex = Regex::new(r"\[\[[^\[\]|]*\|([^\[\]]*)\]\]").unwrap();
    static ref PLAIN_LINK: Regex = Regex::new(r"\[\[([^\[\]|]*)\]\]").unwrap();
    static ref EMPHASIS: Regex = Regex::new(r"'''|''").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"<[^<>]*>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Strip templates, links and formatting from `raw`, leaving plain prose.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        // Every rule that changes the text shortens it, so this terminates.
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(text: &str) -> String {
    let text = rewrite_templates(text, render_template);
    let text = PIPED_LINK.replace_all(&text, "${1}");
    let text = PLAIN_LINK.replace_all(&text, "${1}");
    let text = EMPHASIS.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn render_template(template: &Template) -> String {
    if WRAPPER_TEMPLATES.iter().any(|name| template.is_named(name)) {
        return template.payload().unwrap_or_default().to_string();
    }
    // senseid, lb and anything unrecognized contribute no prose
    String::new()
}
