use element_inspector::analysis::{AttributeFilter, similarity};
use element_inspector::dom::{generate_css_selector, generate_xpath, load_snapshot, resolve_xpath};
use element_inspector::{Analyzer, DomTree, ElementNode, NodeId};

fn list_page() -> DomTree {
    let items = (1..=5)
        .map(|i| ElementNode::new("li").with_attribute("class", "item").with_text(format!("Item {}", i)))
        .collect();
    DomTree::new(
        ElementNode::new("html").with_child(
            ElementNode::new("body")
                .with_child(ElementNode::new("h1").with_text("Results"))
                .with_child(ElementNode::new("ul").with_children(items)),
        ),
    )
}

fn items(tree: &DomTree) -> Vec<NodeId> {
    tree.query_selector_all("ul > li.item").unwrap()
}

#[test]
fn test_third_list_item_repeats_and_relates() {
    let tree = list_page();
    let items = items(&tree);
    let third = items[2];

    let report = Analyzer::new().analyze_element(&tree, Some(third));
    let structure = report.structure.expect("structure for attached element");

    assert_eq!(structure.sibling_count, 5);
    assert_eq!(structure.similar_sibling_count, 4);
    assert!(structure.is_repeating);
    for other in items.iter().filter(|id| **id != third) {
        assert!(report.relationships.contains(other));
    }
}

#[test]
fn test_input_relates_to_its_label() {
    let tree = load_snapshot(
        r#"{
            "tag_name": "body",
            "children": [
                {"tag_name": "label", "attributes": {"for": "x"}, "text_content": "Name"},
                {"tag_name": "input", "attributes": {"id": "x"}}
            ]
        }"#,
    )
    .unwrap();
    let input = tree.get_element_by_id("x").unwrap().node_id();
    let label = tree.query_selector("label").unwrap().unwrap().node_id();

    let report = Analyzer::new().analyze_element(&tree, Some(input));
    assert!(report.relationships.contains(&label));
}

#[test]
fn test_table_cell_relates_to_exactly_its_row() {
    let row = |prefix: &str| {
        ElementNode::new("tr")
            .with_child(ElementNode::new("td").with_text(format!("{} a", prefix)))
            .with_child(ElementNode::new("td").with_text(format!("{} b", prefix)))
            .with_child(ElementNode::new("td").with_text(format!("{} c", prefix)))
    };
    let tree = DomTree::new(
        ElementNode::new("body").with_child(
            ElementNode::new("table").with_child(ElementNode::new("tbody").with_child(row("1")).with_child(row("2"))),
        ),
    );
    let cells = tree.query_selector_all("tr td").unwrap();

    let report = Analyzer::new().analyze_element(&tree, Some(cells[1]));
    assert_eq!(report.relationships, vec![cells[0], cells[2]]);
}

#[test]
fn test_missing_element_gives_empty_shape() {
    let tree = list_page();
    let mut analyzer = Analyzer::new();

    let missing = analyzer.analyze_element(&tree, None);
    let json = serde_json::to_string(&missing).unwrap();
    assert_eq!(
        json,
        r#"{"structure":{},"patterns":{"repeatingStructures":[]},"relationships":[],"selectors":{}}"#
    );

    // A handle from another document does not resolve here, even when its
    // index points at an element of this one
    let other = list_page();
    let foreign = items(&other)[2];
    assert!(tree.element(items(&tree)[2]).is_some());
    assert!(foreign.index() < tree.count_elements());
    assert!(analyzer.analyze_element(&tree, Some(foreign)).is_empty());
}

#[test]
fn test_repeated_analysis_hits_cache() {
    let tree = list_page();
    let third = items(&tree)[2];
    let mut analyzer = Analyzer::new();

    let first = analyzer.analyze_element(&tree, Some(third));
    let second = analyzer.analyze_element(&tree, Some(third));

    assert_eq!(first.relationships, second.relationships);
    assert_eq!(analyzer.relationship_finder().scan_count(), 1);
}

#[test]
fn test_properties_hold_for_every_element() {
    let tree = load_snapshot(
        r#"{
            "tag_name": "html",
            "children": [{
                "tag_name": "body",
                "children": [
                    {"tag_name": "nav", "attributes": {"id": "top", "class": "menu"}, "children": [
                        {"tag_name": "a", "attributes": {"href": "/", "class": "link", "style": "color: red"}},
                        {"tag_name": "a", "attributes": {"href": "/docs", "class": "link"}}
                    ]},
                    {"tag_name": "main", "children": [
                        {"tag_name": "section", "attributes": {"class": "card", "data-v-1a2b": ""}, "children": [
                            {"tag_name": "h2"}, {"tag_name": "p"}
                        ]},
                        {"tag_name": "section", "attributes": {"class": "card"}, "children": [
                            {"tag_name": "h2"}, {"tag_name": "p"}
                        ]},
                        {"tag_name": "form", "children": [
                            {"tag_name": "input", "attributes": {"id": "q", "name": "q", "aria-label": "Search"}},
                            {"tag_name": "button", "attributes": {"type": "submit"}}
                        ]}
                    ]}
                ]
            }]
        }"#,
    )
    .unwrap();
    let filter = AttributeFilter::default();
    let mut analyzer = Analyzer::new();

    for el in tree.elements() {
        assert_eq!(similarity(el, el), 1.0);

        let resolved = resolve_xpath(&tree, &generate_xpath(el));
        assert_eq!(resolved, Some(el.node_id()), "xpath of {:?}", el);

        if let Some(id) = el.id() {
            assert_eq!(generate_css_selector(el), format!("#{}", id));
        }

        let attrs = filter.relevant_attributes(el);
        assert!(attrs.iter().all(|attr| !matches!(attr.name.as_str(), "id" | "class" | "style")));

        let report = analyzer.analyze_element(&tree, Some(el.node_id()));
        let structure = report.structure.unwrap();
        assert_eq!(structure.is_repeating, structure.similar_sibling_count > 0);
    }
}
