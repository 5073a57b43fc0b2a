use crate::analysis::container::{below_body, is_likely_container};
use crate::analysis::kind::ElementKind;
use crate::analysis::similarity::ElementProfile;
use crate::dom::{DocumentId, ElementRef, NodeId};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Minimum similarity for a container child to count as related
pub const RELATIONSHIP_THRESHOLD: f64 = 0.5;

/// Finds structurally similar peers and semantically linked elements.
///
/// Results are memoized per element identity until [`clear`](Self::clear)
/// is called or the finder is dropped with its session.
#[derive(Debug, Default)]
pub struct RelationshipFinder {
    cache: HashMap<(DocumentId, NodeId), Vec<NodeId>>,
    scans: usize,
}

impl RelationshipFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Related elements in discovery order, without duplicates
    pub fn relationships(&mut self, element: ElementRef<'_>) -> Vec<NodeId> {
        let key = (element.tree().id(), element.node_id());
        if let Some(cached) = self.cache.get(&key) {
            log::trace!("Relationship cache hit for {:?}", element);
            return cached.clone();
        }

        let found = self.scan(element);
        self.cache.insert(key, found.clone());
        found
    }

    fn scan(&mut self, element: ElementRef<'_>) -> Vec<NodeId> {
        self.scans += 1;
        log::debug!("Scanning relationships for {:?}", element);

        let mut related = IndexSet::new();

        let container = below_body(element)
            .find(|ancestor| is_likely_container(*ancestor))
            .unwrap_or_else(|| element.tree().body());

        let profile = ElementProfile::new(element);
        for candidate in container.children() {
            if candidate.same_as(&element) {
                continue;
            }
            if profile.similarity_to(candidate) > RELATIONSHIP_THRESHOLD {
                related.insert(candidate.node_id());
            }
        }

        match ElementKind::of(element) {
            ElementKind::FormControl => {
                if let Some(label) = associated_label(element) {
                    related.insert(label.node_id());
                }
            }
            ElementKind::TableCell => {
                related.extend(peers(element, |el| matches!(el.tag_name(), "td" | "th")));
            }
            ElementKind::ListItem => {
                related.extend(peers(element, |el| el.is_tag("li")));
            }
            _ => {}
        }

        related.into_iter().collect()
    }

    /// Number of uncached scans performed so far
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Number of memoized elements
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop all memoized results
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// The `<label for=…>` pointing at the element's id, else an enclosing label
fn associated_label<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let by_reference = element.id().and_then(|id| {
        element
            .tree()
            .elements()
            .find(|candidate| candidate.is_tag("label") && candidate.attribute("for") == Some(id))
    });

    by_reference.or_else(|| element.ancestors().find(|ancestor| ancestor.is_tag("label")))
}

/// Siblings of the element accepted by `keep`, excluding the element itself
fn peers<'a>(element: ElementRef<'a>, keep: impl Fn(&ElementRef<'a>) -> bool + 'a) -> impl Iterator<Item = NodeId> + 'a {
    element
        .parent()
        .into_iter()
        .flat_map(|parent| parent.children())
        .filter(move |sibling| !sibling.same_as(&element) && keep(sibling))
        .map(|sibling| sibling.node_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomTree, ElementNode};

    fn list_tree() -> DomTree {
        let items = (0..5)
            .map(|i| ElementNode::new("li").with_attribute("class", "item").with_text(format!("Item {}", i)))
            .collect();
        DomTree::new(
            ElementNode::new("body")
                .with_child(ElementNode::new("h1"))
                .with_child(ElementNode::new("ul").with_children(items)),
        )
    }

    fn items(tree: &DomTree) -> Vec<NodeId> {
        tree.elements().filter(|el| el.is_tag("li")).map(|el| el.node_id()).collect()
    }

    #[test]
    fn test_list_items_relate_to_each_other() {
        let tree = list_tree();
        let all = items(&tree);
        let third = tree.element(all[2]).unwrap();

        let mut finder = RelationshipFinder::new();
        let related = finder.relationships(third);

        let expected: Vec<_> = all.iter().copied().filter(|id| *id != all[2]).collect();
        assert_eq!(related, expected);
    }

    #[test]
    fn test_results_are_memoized() {
        let tree = list_tree();
        let third = tree.element(items(&tree)[2]).unwrap();

        let mut finder = RelationshipFinder::new();
        let first = finder.relationships(third);
        let second = finder.relationships(third);

        assert_eq!(first, second);
        assert_eq!(finder.scan_count(), 1);
        assert_eq!(finder.cached_len(), 1);
    }

    #[test]
    fn test_clear_forces_rescan() {
        let tree = list_tree();
        let third = tree.element(items(&tree)[2]).unwrap();

        let mut finder = RelationshipFinder::new();
        finder.relationships(third);
        finder.clear();
        finder.relationships(third);

        assert_eq!(finder.scan_count(), 2);
    }

    #[test]
    fn test_cache_is_keyed_by_document() {
        let first_tree = list_tree();
        let second_tree = list_tree();

        let mut finder = RelationshipFinder::new();
        finder.relationships(first_tree.element(items(&first_tree)[0]).unwrap());
        finder.relationships(second_tree.element(items(&second_tree)[0]).unwrap());

        assert_eq!(finder.scan_count(), 2);
    }

    #[test]
    fn test_label_by_reference() {
        let tree = DomTree::new(
            ElementNode::new("body")
                .with_child(ElementNode::new("label").with_attribute("for", "x").with_text("Name"))
                .with_child(ElementNode::new("input").with_attribute("id", "x")),
        );
        let input = tree.get_element_by_id("x").unwrap();
        let label = tree.elements().find(|el| el.is_tag("label")).unwrap();

        let related = RelationshipFinder::new().relationships(input);
        assert_eq!(related, vec![label.node_id()]);
    }

    #[test]
    fn test_enclosing_label() {
        let tree = DomTree::new(
            ElementNode::new("body").with_child(
                ElementNode::new("label")
                    .with_text("Subscribe")
                    .with_child(ElementNode::new("input").with_attribute("type", "checkbox")),
            ),
        );
        let input = tree.elements().find(|el| el.is_tag("input")).unwrap();
        let label = input.parent().unwrap();

        assert_eq!(RelationshipFinder::new().relationships(input), vec![label.node_id()]);
    }

    #[test]
    fn test_table_cells_in_row() {
        let row = ElementNode::new("tr")
            .with_child(ElementNode::new("td").with_text("a"))
            .with_child(ElementNode::new("td").with_text("b"))
            .with_child(ElementNode::new("td").with_text("c"));
        let tree = DomTree::new(
            ElementNode::new("body").with_child(ElementNode::new("table").with_child(ElementNode::new("tbody").with_child(row))),
        );
        let cells: Vec<_> = tree.elements().filter(|el| el.is_tag("td")).collect();

        let related = RelationshipFinder::new().relationships(cells[1]);
        assert_eq!(related, vec![cells[0].node_id(), cells[2].node_id()]);
    }

    #[test]
    fn test_container_search_stops_at_body() {
        let cards = (0..3)
            .map(|i| ElementNode::new("span").with_attribute("class", "card").with_text(format!("Card {}", i)));
        let tree = DomTree::new(
            ElementNode::new("html")
                .with_attribute("class", "js flexbox")
                .with_child(ElementNode::new("head"))
                .with_child(ElementNode::new("body").with_children(cards.collect())),
        );
        let spans: Vec<_> = tree.elements().filter(|el| el.is_tag("span")).map(|el| el.node_id()).collect();
        let first = tree.element(spans[0]).unwrap();

        let related = RelationshipFinder::new().relationships(first);
        assert_eq!(related, vec![spans[1], spans[2]]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let tree = DomTree::new(
            ElementNode::new("body")
                .with_child(ElementNode::new("span").with_attribute("class", "lonely"))
                .with_child(ElementNode::new("img")),
        );
        let span = tree.body().children().next().unwrap();
        assert!(RelationshipFinder::new().relationships(span).is_empty());
    }
}
