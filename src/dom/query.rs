//! A small CSS selector matcher over [`DomTree`].
//!
//! Supports the subset the selector generator emits plus what a user types on
//! the command line: type and universal selectors, `#id`, `.class`,
//! `[attr]`, `[attr=value]`, descendant and child combinators, and
//! comma-separated selector lists. Pseudo-classes are rejected.

use crate::dom::tree::{DomTree, ElementRef, NodeId};
use crate::error::{InspectorError, Result};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, el: ElementRef<'_>) -> bool {
        if self.tag.as_deref().is_some_and(|tag| !el.is_tag(tag)) {
            return false;
        }
        if self.id.as_deref().is_some_and(|id| el.attribute("id") != Some(id)) {
            return false;
        }
        if !self.classes.iter().all(|class| el.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|(name, value)| match value {
            Some(value) => el.attribute(name) == Some(value.as_str()),
            None => el.has_attribute(name),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
    // combinators[i] sits between compounds[i] and compounds[i + 1]
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, el: ElementRef<'_>) -> bool {
        self.matches_at(self.compounds.len() - 1, el)
    }

    fn matches_at(&self, index: usize, el: ElementRef<'_>) -> bool {
        if !self.compounds[index].matches(el) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => el.parent().is_some_and(|parent| self.matches_at(index - 1, parent)),
            Combinator::Descendant => el.ancestors().any(|ancestor| self.matches_at(index - 1, ancestor)),
        }
    }
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self> {
        let mut alternatives = Vec::new();
        for part in split_list(input) {
            let part = part.trim();
            if part.is_empty() {
                return Err(InspectorError::invalid_selector(input, "empty selector"));
            }
            alternatives.push(Parser { input, chars: part.chars().peekable() }.complex()?);
        }
        Ok(Self { alternatives })
    }

    /// Check whether the element matches any alternative
    pub fn matches(&self, el: ElementRef<'_>) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(el))
    }
}

/// Split on top-level commas, leaving quoted attribute values intact
fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            ('"' | '\'', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            (',', None) => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

struct Parser<'s> {
    input: &'s str,
    chars: Peekable<Chars<'s>>,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> InspectorError {
        InspectorError::invalid_selector(self.input, reason)
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {
            skipped = true;
        }
        skipped
    }

    fn complex(&mut self) -> Result<Complex> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();

        loop {
            let saw_space = self.skip_whitespace();
            match self.chars.peek().copied() {
                None => break,
                Some('>') => {
                    self.chars.next();
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some(_) if saw_space => combinators.push(Combinator::Descendant),
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
            compounds.push(self.compound()?);
        }

        Ok(Complex { compounds, combinators })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut empty = true;

        match self.chars.peek() {
            Some('*') => {
                self.chars.next();
                empty = false;
            }
            Some(&c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                empty = false;
            }
            _ => {}
        }

        loop {
            match self.chars.peek() {
                Some('#') => {
                    self.chars.next();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.chars.next();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.chars.next();
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
            empty = false;
        }

        if empty {
            return Err(match self.chars.peek().copied() {
                Some(c) => self.error(format!("unexpected '{}'", c)),
                None => self.error("expected a selector"),
            });
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<(String, Option<String>)> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let value = match self.chars.next() {
            Some(']') => return Ok((name, None)),
            Some('=') => {
                self.skip_whitespace();
                match self.chars.peek() {
                    Some(&q) if q == '"' || q == '\'' => {
                        self.chars.next();
                        self.quoted(q)?
                    }
                    _ => self.ident()?,
                }
            }
            _ => return Err(self.error("malformed attribute selector")),
        };

        self.skip_whitespace();
        match self.chars.next() {
            Some(']') => Ok((name, Some(value))),
            _ => Err(self.error("expected ']'")),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => value.push(self.escape()?),
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn ident(&mut self) -> Result<String> {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\\' {
                self.chars.next();
                ident.push(self.escape()?);
            } else if is_ident_char(c) {
                self.chars.next();
                ident.push(c);
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(ident)
    }

    /// Consume the remainder of an escape sequence after the backslash
    fn escape(&mut self) -> Result<char> {
        let mut hex = String::new();
        while hex.len() < 6 {
            match self.chars.next_if(|c| c.is_ascii_hexdigit()) {
                Some(c) => hex.push(c),
                None => break,
            }
        }
        if hex.is_empty() {
            return self.chars.next().ok_or_else(|| self.error("dangling escape"));
        }
        self.chars.next_if(|c| c.is_whitespace());
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid escape '\\{}'", hex)))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Escape a string for use as a CSS identifier
pub fn escape_identifier(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let leading_digit = i == 0 && c.is_ascii_digit();
        if leading_digit {
            escaped.push_str(&format!("\\{:x} ", c as u32));
        } else if is_ident_char(c) {
            escaped.push(c);
        } else {
            escaped.push('\\');
            escaped.push(c);
        }
    }
    escaped
}

impl DomTree {
    /// All attached elements matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements()
            .filter(|el| selector.matches(*el))
            .map(|el| el.node_id())
            .collect())
    }

    /// First attached element matching `selector`
    pub fn query_selector(&self, selector: &str) -> Result<Option<ElementRef<'_>>> {
        let selector = Selector::parse(selector)?;
        Ok(self.elements().find(|el| selector.matches(*el)))
    }
}
