//! Template analyzer: extracts `hx-*` attribute URIs from `.templ` sources.
//!
//! The scanner walks the markup surface of a template — elements, their
//! attributes, conditional attribute groups — and ignores everything else
//! (code blocks, text, comments, raw `script`/`style` content). Two
//! attribute flavors carry URIs:
//!
//! - constant: `hx-get="/items/42"` — the value is re-wrapped in quotes and
//!   its range starts two columns past the attribute name (`="`);
//! - expression: `hx-get={ fmt.Sprintf("/items/%s", id) }` — the expression
//!   text is used verbatim with its own range.
//!
//! Conditional groups (`if` / `else` inside a tag) are descended, then-branch
//! first. Boolean and spread attributes carry no URI and are skipped.

use thiserror::Error;

use crate::text::LineIndex;
use crate::uri::Uri;

/// Verb attributes recognized on elements, in emission order.
const HX_VERBS: [(&str, &str); 4] = [
    ("hx-get", "GET"),
    ("hx-post", "POST"),
    ("hx-put", "PUT"),
    ("hx-delete", "DELETE"),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unexpected end of template inside an element")]
    UnexpectedEof,
    #[error("malformed attribute at byte {0}")]
    MalformedAttribute(usize),
}

/// Parse a template and collect the URIs referenced by its elements.
pub fn template_uris(src: &str) -> Result<Vec<Uri>, TemplateError> {
    let mut scanner = Scanner {
        bytes: src.as_bytes(),
        src,
        pos: 0,
        index: LineIndex::new(src),
        uris: Vec::new(),
    };
    scanner.run()?;
    Ok(scanner.uris)
}

#[derive(Debug, Clone)]
enum AttrValue {
    /// Quoted or bare constant; `offset` is the byte position of the value.
    Constant { value: String, offset: usize },
    /// `{ ... }` expression; `offset` is the byte position of the trimmed text.
    Expression { text: String, offset: usize },
}

#[derive(Debug, Clone)]
struct Attr {
    name: String,
    value: AttrValue,
}

struct Scanner<'a> {
    bytes: &'a [u8],
    src: &'a str,
    pos: usize,
    index: LineIndex,
    uris: Vec<Uri>,
}

impl Scanner<'_> {
    fn run(&mut self) -> Result<(), TemplateError> {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] != b'<' {
                self.pos += 1;
                continue;
            }
            if self.src[self.pos..].starts_with("<!--") {
                self.skip_past("-->");
            } else if self.peek_at(1) == Some(b'/') {
                self.skip_past(">");
            } else if self.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic()) {
                self.element()?;
            } else {
                self.pos += 1;
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn skip_past(&mut self, marker: &str) {
        match self.src[self.pos..].find(marker) {
            Some(i) => self.pos += i + marker.len(),
            None => self.pos = self.bytes.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Parse one element: tag name, attribute list, raw-content skip.
    fn element(&mut self) -> Result<(), TemplateError> {
        self.pos += 1; // '<'
        let name_start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            self.pos += 1;
        }
        let tag = self.src[name_start..self.pos].to_string();

        let mut attrs = Vec::new();
        let self_closing = self.attributes(&mut attrs, b'>')?;
        self.emit_uris(&attrs);

        // Raw elements: their content is not markup.
        if !self_closing && (tag == "script" || tag == "style") {
            self.skip_past(&format!("</{tag}"));
            self.skip_past(">");
        }
        Ok(())
    }

    /// Parse attributes until the terminator (`>` for a tag, `}` for a
    /// conditional group). Returns whether the tag was self-closing.
    fn attributes(&mut self, attrs: &mut Vec<Attr>, until: u8) -> Result<bool, TemplateError> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(TemplateError::UnexpectedEof),
                Some(b) if b == until => {
                    self.pos += 1;
                    return Ok(false);
                }
                Some(b'/') if until == b'>' && self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    return Ok(true);
                }
                Some(b'{') => {
                    // Spread attributes: `{ attrs... }` — nothing to extract.
                    self.pos += 1;
                    self.balanced_braces()?;
                }
                _ if self.at_keyword("if") => self.conditional(attrs)?,
                _ => self.attribute(attrs)?,
            }
        }
    }

    /// `if <cond> { attrs } [else if ... | else { attrs }]` inside a tag.
    fn conditional(&mut self, attrs: &mut Vec<Attr>) -> Result<(), TemplateError> {
        self.pos += 2; // "if"
        self.skip_condition()?;
        self.pos += 1; // '{'
        self.attributes(attrs, b'}')?;

        self.skip_whitespace();
        if self.at_keyword("else") {
            self.pos += 4;
            self.skip_whitespace();
            if self.at_keyword("if") {
                return self.conditional(attrs);
            }
            if self.peek() != Some(b'{') {
                return Err(TemplateError::MalformedAttribute(self.pos));
            }
            self.pos += 1;
            self.attributes(attrs, b'}')?;
        }
        Ok(())
    }

    fn at_keyword(&self, word: &str) -> bool {
        let rest = &self.src[self.pos..];
        rest.starts_with(word)
            && rest[word.len()..]
                .bytes()
                .next()
                .is_some_and(|b| b.is_ascii_whitespace() || b == b'{')
    }

    /// Advance past the condition of an `if`, stopping at its opening brace.
    fn skip_condition(&mut self) -> Result<(), TemplateError> {
        loop {
            match self.peek() {
                None => return Err(TemplateError::UnexpectedEof),
                Some(b'{') => return Ok(()),
                Some(b'"') | Some(b'`') => self.skip_string()?,
                _ => self.pos += 1,
            }
        }
    }

    /// One attribute: `name`, `name="value"`, `name={ expr }`.
    fn attribute(&mut self, attrs: &mut Vec<Attr>) -> Result<(), TemplateError> {
        let name_start = self.pos;
        while self.peek().is_some_and(is_attr_name_byte) {
            self.pos += 1;
        }
        if self.pos == name_start {
            return Err(TemplateError::MalformedAttribute(self.pos));
        }
        let name = self.src[name_start..self.pos].to_string();

        if self.peek() != Some(b'=') {
            // Boolean attribute — carries no value, nothing to record.
            return Ok(());
        }
        self.pos += 1;

        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|b| b != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(TemplateError::UnexpectedEof);
                }
                let value = self.src[start..self.pos].to_string();
                self.pos += 1;
                AttrValue::Constant {
                    value,
                    offset: start,
                }
            }
            Some(b'{') => {
                self.pos += 1;
                let start = self.pos;
                let end = self.balanced_braces()?;
                let inner = &self.src[start..end];
                let text = inner.trim();
                let offset = start + (inner.len() - inner.trim_start().len());
                AttrValue::Expression {
                    text: text.to_string(),
                    offset,
                }
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| !b.is_ascii_whitespace() && b != b'>')
                {
                    self.pos += 1;
                }
                AttrValue::Constant {
                    value: self.src[start..self.pos].to_string(),
                    offset: start,
                }
            }
            None => return Err(TemplateError::UnexpectedEof),
        };

        attrs.push(Attr { name, value });
        Ok(())
    }

    /// Consume up to and including the `}` matching an already-consumed `{`,
    /// skipping string literals. Returns the byte offset of the closing brace.
    fn balanced_braces(&mut self) -> Result<usize, TemplateError> {
        let mut depth = 1usize;
        loop {
            match self.peek() {
                None => return Err(TemplateError::UnexpectedEof),
                Some(b'"') | Some(b'`') => self.skip_string()?,
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    depth -= 1;
                    if depth == 0 {
                        let end = self.pos;
                        self.pos += 1;
                        return Ok(end);
                    }
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a `"..."` (with escapes) or `` `...` `` literal.
    fn skip_string(&mut self) -> Result<(), TemplateError> {
        let quote = self.bytes[self.pos];
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(TemplateError::UnexpectedEof),
                Some(b'\\') if quote == b'"' => self.pos += 2,
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Emit one URI per recognized verb attribute, first occurrence wins.
    fn emit_uris(&mut self, attrs: &[Attr]) {
        for (attr_name, verb) in HX_VERBS {
            let Some(attr) = attrs.iter().find(|a| a.name == attr_name) else {
                continue;
            };
            let uri = match &attr.value {
                AttrValue::Constant { value, offset } => Uri::parse_at(
                    verb,
                    format!("\"{value}\""),
                    self.index.position(*offset),
                    self.index.position(offset + value.len()),
                ),
                AttrValue::Expression { text, offset } => Uri::parse_at(
                    verb,
                    text.clone(),
                    self.index.position(*offset),
                    self.index.position(offset + text.len()),
                ),
            };
            self.uris.push(uri);
        }
    }
}

fn is_attr_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'@' | b'.')
}
