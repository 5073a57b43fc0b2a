use crate::dom::query::escape_identifier;
use crate::dom::tree::{DomTree, ElementRef, NodeId};
use serde::{Deserialize, Serialize};

/// CSS and XPath selectors that locate one element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorPair {
    pub css: String,
    pub xpath: String,
}

impl SelectorPair {
    /// Build both selectors for an element
    pub fn for_element(el: ElementRef<'_>) -> Self {
        Self {
            css: generate_css_selector(el),
            xpath: generate_xpath(el),
        }
    }
}

/// `tag.class1.class2`, or `#id` when the element carries one
fn css_segment(el: ElementRef<'_>) -> (String, bool) {
    if let Some(id) = el.id() {
        return (format!("#{}", escape_identifier(id)), true);
    }

    let mut segment = el.tag_name().to_string();
    for class in el.classes() {
        segment.push('.');
        segment.push_str(&escape_identifier(class));
    }
    (segment, false)
}

/// CSS path from the nearest identified ancestor (or the root) down to `el`.
///
/// Identifiers are trusted to be unique; no document query is made.
pub fn generate_css_selector(el: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    for current in std::iter::once(el).chain(el.ancestors()) {
        let (segment, anchored) = css_segment(current);
        segments.push(segment);
        if anchored {
            break;
        }
    }
    segments.reverse();
    segments.join(" > ")
}

/// Like [`generate_css_selector`], but stops as soon as the path matches
/// exactly one element in the document.
///
/// Falls back to the full path when uniqueness is never reached.
pub fn generate_unique_css_selector(el: ElementRef<'_>) -> String {
    let tree = el.tree();
    let mut path = String::new();

    for current in std::iter::once(el).chain(el.ancestors()) {
        let (segment, anchored) = css_segment(current);
        path = if path.is_empty() {
            segment
        } else {
            format!("{} > {}", segment, path)
        };

        if anchored || matches_uniquely(tree, &path) {
            break;
        }
    }
    path
}

fn matches_uniquely(tree: &DomTree, path: &str) -> bool {
    match tree.query_selector_all(path) {
        Ok(matches) => matches.len() == 1,
        Err(e) => {
            log::debug!("Uniqueness check skipped for '{}': {}", path, e);
            false
        }
    }
}

/// Absolute XPath with 1-based positional indices among same-tag siblings,
/// anchored at the nearest element carrying an id.
pub fn generate_xpath(el: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut anchor = None;

    for current in std::iter::once(el).chain(el.ancestors()) {
        if let Some(id) = current.id() {
            anchor = Some(id_anchor(id));
            break;
        }
        segments.push(format!("{}[{}]", current.tag_name(), same_tag_position(current)));
    }
    segments.reverse();

    match anchor {
        Some(anchor) if segments.is_empty() => anchor,
        Some(anchor) => format!("{}/{}", anchor, segments.join("/")),
        None => format!("/{}", segments.join("/")),
    }
}

fn id_anchor(id: &str) -> String {
    if id.contains('"') {
        format!("//*[@id='{}']", id)
    } else {
        format!("//*[@id=\"{}\"]", id)
    }
}

fn same_tag_position(el: ElementRef<'_>) -> usize {
    match el.parent() {
        Some(parent) => {
            parent
                .children()
                .take_while(|sibling| !sibling.same_as(&el))
                .filter(|sibling| sibling.tag_name() == el.tag_name())
                .count()
                + 1
        }
        None => 1,
    }
}

/// Re-resolve an XPath produced by [`generate_xpath`].
///
/// Only the generated grammar is understood: an optional `//*[@id="…"]`
/// anchor followed by `tag[n]` steps.
pub fn resolve_xpath(tree: &DomTree, xpath: &str) -> Option<NodeId> {
    let (mut current, steps) = match xpath.strip_prefix("//*[@id=") {
        Some(rest) => {
            let quote = rest.chars().next().filter(|q| *q == '"' || *q == '\'')?;
            let rest = &rest[1..];
            let end = rest.find(&format!("{}]", quote))?;
            let anchor = tree.get_element_by_id(&rest[..end])?;
            (Some(anchor), &rest[end + 2..])
        }
        None => (None, xpath.strip_prefix('/')?),
    };

    for step in steps.split('/').filter(|step| !step.is_empty()) {
        let (tag, position) = parse_step(step)?;
        let next = match current {
            None => std::iter::once(tree.root())
                .filter(|el| el.tag_name() == tag)
                .nth(position - 1),
            Some(el) => el.children().filter(|child| child.tag_name() == tag).nth(position - 1),
        };
        current = Some(next?);
    }

    current.map(|el| el.node_id())
}

fn parse_step(step: &str) -> Option<(&str, usize)> {
    let (tag, rest) = step.split_once('[')?;
    let position: usize = rest.strip_suffix(']')?.parse().ok()?;
    (position > 0 && !tag.is_empty()).then_some((tag, position))
}
