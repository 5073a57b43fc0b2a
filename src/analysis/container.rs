use crate::dom::ElementRef;
use std::collections::HashSet;

const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "main", "aside", "nav", "header", "footer", "ul", "ol", "dl", "menu", "table",
    "thead", "tbody", "tfoot", "tr", "form", "fieldset",
];

const CONTAINER_ROLES: &[&str] = &["group", "list", "grid", "tablist"];

const LAYOUT_KEYWORDS: &[&str] = &["container", "wrapper", "content", "layout", "grid", "flex", "list"];

const CONTAINER_DISPLAYS: &[&str] = &["flex", "grid", "table"];

const TRANSIENT_PREFIXES: &[&str] = &["js-", "is-", "has-"];

const TRANSIENT_CLASSES: &[&str] = &["active", "visible", "hidden"];

/// Whether the element groups or lays out its children
pub fn is_likely_container(el: ElementRef<'_>) -> bool {
    if CONTAINER_TAGS.contains(&el.tag_name()) {
        return true;
    }

    if el.role().is_some_and(|role| CONTAINER_ROLES.contains(&role)) {
        return true;
    }

    if let Some(class_name) = el.class_name() {
        let lowered = class_name.to_ascii_lowercase();
        if LAYOUT_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
            return true;
        }
    }

    if el.computed_display().is_some_and(|display| CONTAINER_DISPLAYS.contains(&display)) {
        return true;
    }

    has_repeated_children(el)
}

/// Ancestors of the element, stopping before the body
pub(crate) fn below_body<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element.ancestors().take_while(|ancestor| !ancestor.is_body())
}

/// At least two children share both tag and full class string
fn has_repeated_children(el: ElementRef<'_>) -> bool {
    if el.child_count() < 2 {
        return false;
    }
    let mut seen = HashSet::new();
    el.children()
        .any(|child| !seen.insert((child.tag_name(), child.class_name().unwrap_or_default())))
}

fn is_transient_class(class: &str) -> bool {
    TRANSIENT_CLASSES.contains(&class) || TRANSIENT_PREFIXES.iter().any(|prefix| class.starts_with(prefix))
}

/// Stable grouping key: `tag#id.classes[role="…"]{child,tags}`.
///
/// State classes that toggle at runtime are left out, so a container keeps its
/// signature while the page reacts to the user.
pub fn container_signature(el: ElementRef<'_>) -> String {
    let mut signature = el.tag_name().to_string();

    if let Some(id) = el.id() {
        signature.push('#');
        signature.push_str(id);
    }

    let stable: Vec<&str> = el.classes().filter(|class| !is_transient_class(class)).collect();
    if !stable.is_empty() {
        signature.push('.');
        signature.push_str(&stable.join("."));
    }

    if let Some(role) = el.role() {
        signature.push_str(&format!("[role=\"{}\"]", role));
    }

    let mut child_tags: Vec<&str> = el.children().map(|child| child.tag_name()).collect();
    child_tags.sort_unstable();
    signature.push('{');
    signature.push_str(&child_tags.join(","));
    signature.push('}');

    signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomTree, ElementNode};

    fn first(tree: &DomTree) -> ElementRef<'_> {
        tree.body().children().next().unwrap()
    }

    fn single(node: ElementNode) -> DomTree {
        DomTree::new(ElementNode::new("body").with_child(node))
    }

    #[test]
    fn test_structural_tags_are_containers() {
        for tag in ["div", "ul", "table", "form", "section"] {
            let tree = single(ElementNode::new(tag));
            assert!(is_likely_container(first(&tree)), "{}", tag);
        }
    }

    #[test]
    fn test_plain_inline_element_is_not_container() {
        let tree = single(ElementNode::new("span").with_child(ElementNode::new("b")));
        assert!(!is_likely_container(first(&tree)));
    }

    #[test]
    fn test_role_qualifies() {
        let tree = single(ElementNode::new("span").with_attribute("role", "tablist"));
        assert!(is_likely_container(first(&tree)));
    }

    #[test]
    fn test_layout_class_keyword_is_case_insensitive() {
        let tree = single(ElementNode::new("span").with_attribute("class", "PageWrapper"));
        assert!(is_likely_container(first(&tree)));
    }

    #[test]
    fn test_computed_display_qualifies() {
        let tree = single(ElementNode::new("span").with_display("grid"));
        assert!(is_likely_container(first(&tree)));

        let tree = single(ElementNode::new("span").with_display("inline"));
        assert!(!is_likely_container(first(&tree)));
    }

    #[test]
    fn test_repeated_children_qualify() {
        let tree = single(
            ElementNode::new("span")
                .with_child(ElementNode::new("a").with_attribute("class", "tag"))
                .with_child(ElementNode::new("a").with_attribute("class", "tag")),
        );
        assert!(is_likely_container(first(&tree)));

        let tree = single(
            ElementNode::new("span")
                .with_child(ElementNode::new("a").with_attribute("class", "tag"))
                .with_child(ElementNode::new("a").with_attribute("class", "tag other")),
        );
        assert!(!is_likely_container(first(&tree)));
    }

    #[test]
    fn test_signature_layout() {
        let tree = single(
            ElementNode::new("ul")
                .with_attribute("id", "results")
                .with_attribute("class", "list js-sortable is-open active cards")
                .with_attribute("role", "list")
                .with_child(ElementNode::new("li"))
                .with_child(ElementNode::new("div"))
                .with_child(ElementNode::new("li")),
        );
        assert_eq!(
            container_signature(first(&tree)),
            "ul#results.list.cards[role=\"list\"]{div,li,li}"
        );
    }

    #[test]
    fn test_signature_without_optional_parts() {
        let tree = single(ElementNode::new("section").with_attribute("class", "hidden"));
        assert_eq!(container_signature(first(&tree)), "section{}");
    }
}
