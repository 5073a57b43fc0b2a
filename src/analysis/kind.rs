use crate::dom::ElementRef;
use serde::Serialize;

/// Closed classification of an element by its tag name.
///
/// Computed once per analysis call and dispatched with `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    FormControl,
    Button,
    Label,
    Link,
    TableCell,
    TableRow,
    Table,
    ListItem,
    List,
    Generic,
}

impl ElementKind {
    pub fn of(el: ElementRef<'_>) -> Self {
        match el.tag_name() {
            "input" | "select" | "textarea" => Self::FormControl,
            "button" => Self::Button,
            "label" => Self::Label,
            "a" => Self::Link,
            "td" | "th" => Self::TableCell,
            "tr" => Self::TableRow,
            "table" => Self::Table,
            "li" => Self::ListItem,
            "ul" | "ol" | "menu" => Self::List,
            _ => Self::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomTree, ElementNode};

    #[test]
    fn test_classification() {
        let tree = DomTree::new(
            ElementNode::new("body")
                .with_child(ElementNode::new("INPUT"))
                .with_child(ElementNode::new("th"))
                .with_child(ElementNode::new("ol"))
                .with_child(ElementNode::new("span")),
        );

        let kinds: Vec<_> = tree.body().children().map(ElementKind::of).collect();
        assert_eq!(
            kinds,
            vec![ElementKind::FormControl, ElementKind::TableCell, ElementKind::List, ElementKind::Generic]
        );
    }
}
