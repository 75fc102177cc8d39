//! Brace- and bracket-aware reader for wikitext templates and links.
//!
//! Regexes cannot balance `{{ ... {{ ... }} ... }}` or see that the pipe in
//! `[[cat|cats]]` does not split a template argument, so templates are read
//! with a small recursive-descent scanner instead. Nesting is handled by the
//! call stack; there are no depth counters.

/// Parsed wikilink: `[[target#anchor|display]]`. The anchor is read past and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wikilink {
    pub target: String,
    pub display: Option<String>,
}

impl Wikilink {
    /// Display text if present, otherwise the target.
    pub fn text(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.target)
    }
}

/// Parsed template: `{{name|param1|param2|...}}`
///
/// Parameters are already flattened to prose: links become their text and
/// nested templates are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub params: Vec<String>,
    /// False when the input ended before the closing `}}`.
    pub terminated: bool,
}

impl Template {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name)
    }

    /// Last parameter after the leading language code, e.g. `liberty` in
    /// `{{senseid|en|liberty}}`. `None` when only the language code is given.
    pub fn payload(&self) -> Option<&str> {
        self.params.get(1..)?.last().map(String::as_str)
    }
}

struct WikitextScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> WikitextScanner<'a> {
    fn new(text: &'a str) -> Self {
        WikitextScanner { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at(&self, token: &str) -> bool {
        self.rest().starts_with(token)
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    // Tokens are ASCII, so advancing by their byte length stays on a char boundary.
    fn consume(&mut self, token: &str) {
        self.pos += token.len();
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    // ─────────────────────────────────────────────────────────────
    // wikilink ::= "[[" target ("#" anchor)? ("|" display)? "]]"
    // ─────────────────────────────────────────────────────────────
    fn parse_wikilink(&mut self) -> Wikilink {
        self.consume("[[");

        let target = self.read_until(&["#", "|", "]", "}}"]);
        let mut display = None;

        if self.at("#") {
            self.consume("#");
            self.read_until(&["|", "]", "}}"]);
        }

        if self.at("|") {
            self.consume("|");
            display = Some(self.read_until(&["]", "}}"]));
        }

        if self.at("]]") {
            self.consume("]]");
        }

        Wikilink { target, display }
    }

    fn read_until(&mut self, stops: &[&str]) -> String {
        let mut result = String::new();
        while !self.at_end() && !stops.iter().any(|s| self.at(s)) {
            if let Some(c) = self.consume_char() {
                result.push(c);
            }
        }
        result
    }

    // ─────────────────────────────────────────────────────────────
    // template ::= "{{" param ("|" param)* "}}"
    // ─────────────────────────────────────────────────────────────
    fn parse_template(&mut self) -> Template {
        self.consume("{{");

        let mut params = Vec::new();
        while !self.at_end() && !self.at("}}") {
            params.push(self.parse_template_param());
            if self.at("|") {
                self.consume("|");
            } else {
                break;
            }
        }

        let terminated = self.at("}}");
        if terminated {
            self.consume("}}");
        }

        let mut params = params.into_iter();
        let name = params.next().unwrap_or_default();
        Template {
            name,
            params: params.collect(),
            terminated,
        }
    }

    // param ::= (wikilink | template | char)*  (terminated by "|" or "}}")
    fn parse_template_param(&mut self) -> String {
        let mut result = String::new();
        while !self.at_end() && !self.at("|") && !self.at("}}") {
            if self.at("[[") {
                let wikilink = self.parse_wikilink();
                result.push_str(wikilink.text());
            } else if self.at("{{") {
                // Nested templates produce no text
                let _ = self.parse_template();
            } else if let Some(c) = self.consume_char() {
                result.push(c);
            }
        }
        result.trim().to_string()
    }

    /// Copy plain text up to the next `{{`, returning false at end of input.
    fn copy_text_into(&mut self, out: &mut String) -> bool {
        let rest = self.rest();
        match rest.find("{{") {
            Some(offset) => {
                out.push_str(&rest[..offset]);
                self.pos += offset;
                true
            }
            None => {
                out.push_str(rest);
                self.pos = self.text.len();
                false
            }
        }
    }
}

/// Replace every top-level template in `text` with whatever `render` returns.
///
/// Text outside templates, including links, is copied through untouched.
/// An unterminated template swallows the rest of the input.
pub fn rewrite_templates<F>(text: &str, mut render: F) -> String
where
    F: FnMut(&Template) -> String,
{
    let mut scanner = WikitextScanner::new(text);
    let mut out = String::with_capacity(text.len());

    while scanner.copy_text_into(&mut out) {
        let template = scanner.parse_template();
        if template.terminated {
            out.push_str(&render(&template));
        }
    }

    out
}

/// First complete top-level template called `name` (case-insensitive).
pub fn find_template(text: &str, name: &str) -> Option<Template> {
    let mut scanner = WikitextScanner::new(text);
    let mut skipped = String::new();

    while scanner.copy_text_into(&mut skipped) {
        let template = scanner.parse_template();
        if template.terminated && template.is_named(name) {
            return Some(template);
        }
        skipped.clear();
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for the template scanner
// ─────────────────────────────────────────────────────────────────────────────
