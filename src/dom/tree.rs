use crate::dom::element::ElementNode;
use crate::error::{InspectorError, Result};
use headless_chrome::Tab;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one extracted document. Two trees never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(u64);

/// Handle to an element inside a [`DomTree`].
///
/// A handle carries the document that issued it and never resolves in any
/// other tree. Identity is handle equality, never structural equality.
/// Serializes as the bare index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    document: DocumentId,
    index: usize,
}

impl NodeId {
    /// Position of the node in the arena, which is its document (preorder) position
    /// until the host mutates the tree.
    pub fn index(self) -> usize {
        self.index
    }

    /// The document that issued this handle
    pub fn document(self) -> DocumentId {
        self.document
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.index as u64)
    }
}

#[derive(Debug)]
struct NodeData {
    tag_name: String,
    attributes: IndexMap<String, String>,
    text_content: Option<String>,
    computed_display: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

/// Arena-backed document tree extracted from a page
#[derive(Debug)]
pub struct DomTree {
    id: DocumentId,
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl DomTree {
    /// Build a tree from an element snapshot
    pub fn new(root: ElementNode) -> Self {
        let id = DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed));
        let mut tree = Self {
            id,
            nodes: Vec::new(),
            root: NodeId { document: id, index: 0 },
        };
        tree.root = tree.insert(root, None);
        tree
    }

    fn insert(&mut self, node: ElementNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId {
            document: self.id,
            index: self.nodes.len(),
        };
        let ElementNode {
            tag_name,
            attributes,
            text_content,
            children,
            computed_display,
            ..
        } = node;

        self.nodes.push(NodeData {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes,
            text_content,
            computed_display: computed_display.map(|d| d.trim().to_ascii_lowercase()),
            parent,
            children: Vec::with_capacity(children.len()),
            attached: true,
        });

        for child in children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.index].children.push(child_id);
        }

        id
    }

    /// Build DOM tree from a browser tab
    pub fn from_tab(tab: &Arc<Tab>) -> Result<Self> {
        let js_code = include_str!("extract_dom.js");

        let result = tab
            .evaluate(js_code, false)
            .map_err(|e| InspectorError::DomParseFailed(format!("Failed to execute DOM extraction script: {}", e)))?;

        let json_value = result
            .value
            .ok_or_else(|| InspectorError::DomParseFailed("No value returned from DOM extraction".to_string()))?;

        // The script returns a JSON string rather than an object
        let json_str: String = serde_json::from_value(json_value)
            .map_err(|e| InspectorError::DomParseFailed(format!("Failed to get JSON string: {}", e)))?;

        Self::from_json(&json_str)
    }

    /// Build DOM tree from a serialized [`ElementNode`] snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        let root: ElementNode = serde_json::from_str(json)
            .map_err(|e| InspectorError::DomParseFailed(format!("Failed to parse DOM JSON: {}", e)))?;
        Ok(Self::new(root))
    }

    /// Identity of this document
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The document root element
    pub fn root(&self) -> ElementRef<'_> {
        ElementRef { tree: self, id: self.root }
    }

    /// The `<body>` element, or the root when the snapshot has none
    pub fn body(&self) -> ElementRef<'_> {
        let root = self.root();
        if root.is_tag("body") {
            return root;
        }
        root.children().find(|child| child.is_tag("body")).unwrap_or(root)
    }

    /// Resolve a handle to an element that is still part of the document
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        if id.document != self.id {
            return None;
        }
        self.nodes
            .get(id.index)
            .filter(|node| node.attached)
            .map(|_| ElementRef { tree: self, id })
    }

    /// Check whether a handle still resolves to an attached element
    pub fn contains(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// All attached elements in document order, starting at the root
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        std::iter::once(self.root()).chain(self.root().descendants())
    }

    /// First attached element whose `id` attribute equals `value`
    pub fn get_element_by_id(&self, value: &str) -> Option<ElementRef<'_>> {
        if value.is_empty() {
            return None;
        }
        self.elements().find(|el| el.attribute("id") == Some(value))
    }

    /// Count attached elements
    pub fn count_elements(&self) -> usize {
        self.elements().count()
    }

    /// Remove an element and its subtree from the document, the way the host
    /// page would. Handles into the subtree stop resolving afterwards.
    ///
    /// Returns `false` for the root or for elements already detached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }

        if let Some(parent) = self.nodes[id.index].parent.take() {
            self.nodes[parent.index].children.retain(|&child| child != id);
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let node = &mut self.nodes[current.index];
            node.attached = false;
            pending.extend(node.children.iter().copied());
        }

        true
    }

    /// Convert the DOM tree back to a JSON snapshot
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.root().to_node())
            .map_err(|e| InspectorError::DomParseFailed(format!("Failed to serialize DOM to JSON: {}", e)))
    }
}

/// Borrowed view of one element in a [`DomTree`]
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    tree: &'a DomTree,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id.index]
    }

    fn at(&self, id: NodeId) -> ElementRef<'a> {
        ElementRef { tree: self.tree, id }
    }

    /// The handle of this element
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// The tree this element belongs to
    pub fn tree(&self) -> &'a DomTree {
        self.tree
    }

    /// Reference identity: same document and same node
    pub fn same_as(&self, other: &ElementRef<'_>) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }

    pub fn tag_name(&self) -> &'a str {
        &self.data().tag_name
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name().eq_ignore_ascii_case(tag)
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.data().attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.data().attributes.contains_key(name)
    }

    /// Attributes in document order
    pub fn attributes(self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.data()
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Non-empty `id` attribute
    pub fn id(&self) -> Option<&'a str> {
        self.attribute("id").filter(|id| !id.trim().is_empty())
    }

    /// Raw `class` attribute
    pub fn class_name(&self) -> Option<&'a str> {
        self.attribute("class")
    }

    /// Individual class names, in attribute order
    pub fn classes(self) -> impl Iterator<Item = &'a str> + 'a {
        self.class_name().unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|c| c == class_name)
    }

    /// Explicit `role` attribute
    pub fn role(&self) -> Option<&'a str> {
        self.attribute("role").map(str::trim).filter(|role| !role.is_empty())
    }

    /// Computed `display` style, lowercased
    pub fn computed_display(&self) -> Option<&'a str> {
        self.data().computed_display.as_deref()
    }

    /// Text directly owned by this element
    pub fn own_text(&self) -> Option<&'a str> {
        self.data().text_content.as_deref()
    }

    /// Text of the element and all descendants, in document order
    pub fn text_content(&self) -> String {
        std::iter::once(*self)
            .chain(self.descendants())
            .filter_map(|el| el.own_text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.data().parent.map(|id| self.at(id))
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        std::iter::successors(self.parent(), |el| el.parent())
    }

    pub fn children(self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| ElementRef { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    /// Descendants in document order, excluding this element
    pub fn descendants(self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let tree = self.tree;
        let mut pending: Vec<NodeId> = self.data().children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = pending.pop()?;
            pending.extend(tree.nodes[id.index].children.iter().rev().copied());
            Some(ElementRef { tree, id })
        })
    }

    /// Whether this element is the document body
    pub fn is_body(&self) -> bool {
        self.same_as(&self.tree.body())
    }

    /// Rebuild an owned snapshot of this subtree
    pub fn to_node(&self) -> ElementNode {
        let data = self.data();
        ElementNode {
            tag_name: data.tag_name.clone(),
            attributes: data.attributes.clone(),
            text_content: data.text_content.clone(),
            children: self.children().map(|child| child.to_node()).collect(),
            computed_display: data.computed_display.clone(),
            is_visible: true,
            bounding_box: None,
        }
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for ElementRef<'_> {}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag_name())?;
        if let Some(id) = self.id() {
            write!(f, " id=\"{}\"", id)?;
        }
        if let Some(class) = self.class_name() {
            write!(f, " class=\"{}\"", class)?;
        }
        write!(f, "> @{}", self.id.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree() -> DomTree {
        let body = ElementNode::new("body")
            .with_child(
                ElementNode::new("header").with_child(
                    ElementNode::new("button")
                        .with_attribute("id", "nav-btn")
                        .with_text("Menu"),
                ),
            )
            .with_child(
                ElementNode::new("main")
                    .with_child(ElementNode::new("a").with_attribute("href", "/page").with_text("Click here"))
                    .with_child(ElementNode::new("div").with_attribute("class", "content").with_text("Some text")),
            );

        DomTree::new(ElementNode::new("html").with_child(ElementNode::new("head")).with_child(body))
    }

    #[test]
    fn test_dom_tree_creation() {
        let tree = create_test_tree();

        assert_eq!(tree.root().tag_name(), "html");
        assert_eq!(tree.body().tag_name(), "body");
        assert_eq!(tree.body().child_count(), 2);
    }

    #[test]
    fn test_body_falls_back_to_root() {
        let tree = DomTree::new(ElementNode::new("div").with_child(ElementNode::new("span")));
        assert!(tree.body().same_as(&tree.root()));
    }

    #[test]
    fn test_count_elements() {
        let tree = create_test_tree();
        // html, head, body, header, button, main, a, div
        assert_eq!(tree.count_elements(), 8);
    }

    #[test]
    fn test_document_order() {
        let tree = create_test_tree();
        let tags: Vec<_> = tree.elements().map(|el| el.tag_name()).collect();
        assert_eq!(tags, vec!["html", "head", "body", "header", "button", "main", "a", "div"]);
    }

    #[test]
    fn test_get_element_by_id() {
        let tree = create_test_tree();
        let button = tree.get_element_by_id("nav-btn").unwrap();

        assert_eq!(button.tag_name(), "button");
        assert_eq!(button.parent().unwrap().tag_name(), "header");
        assert!(tree.get_element_by_id("missing").is_none());
        assert!(tree.get_element_by_id("").is_none());
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let tree = create_test_tree();
        let button = tree.get_element_by_id("nav-btn").unwrap();
        let tags: Vec<_> = button.ancestors().map(|el| el.tag_name()).collect();
        assert_eq!(tags, vec!["header", "body", "html"]);
    }

    #[test]
    fn test_iterators_outlive_the_element_view() {
        let tree = create_test_tree();
        let ancestors = tree.get_element_by_id("nav-btn").unwrap().ancestors();
        let children = tree.root().children();

        let tags: Vec<_> = ancestors.chain(children).map(|el| el.tag_name()).collect();
        assert_eq!(tags, vec!["header", "body", "html", "head", "body"]);
    }

    #[test]
    fn test_identity_is_per_document() {
        let first = create_test_tree();
        let second = create_test_tree();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.body().node_id().index(), second.body().node_id().index());
        assert_ne!(first.body().node_id(), second.body().node_id());
        assert!(!first.body().same_as(&second.body()));
        assert_eq!(first.body(), first.body());
    }

    #[test]
    fn test_detach_invalidates_subtree() {
        let mut tree = create_test_tree();
        let header = tree.body().children().next().unwrap().node_id();
        let button = tree.get_element_by_id("nav-btn").unwrap().node_id();

        assert!(tree.detach(header));
        assert!(!tree.contains(header));
        assert!(!tree.contains(button));
        assert_eq!(tree.body().child_count(), 1);
        assert!(!tree.detach(header));
        assert!(!tree.detach(tree.root().node_id()));
    }

    #[test]
    fn test_element_rejects_unknown_handle() {
        let tree = create_test_tree();
        let unknown = NodeId {
            document: tree.id(),
            index: 10_000,
        };
        assert!(tree.element(unknown).is_none());
    }

    #[test]
    fn test_element_rejects_handle_from_other_document() {
        let first = create_test_tree();
        let second = create_test_tree();
        let button = first.get_element_by_id("nav-btn").unwrap().node_id();

        assert!(button.index() < second.count_elements());
        assert!(second.element(button).is_none());
        assert!(!second.contains(button));
        assert!(first.element(button).is_some());
    }

    #[test]
    fn test_node_id_serializes_as_index() {
        let tree = create_test_tree();
        let body = tree.body().node_id();
        assert_eq!(serde_json::to_string(&body).unwrap(), "2");
    }

    #[test]
    fn test_text_content_collects_descendants() {
        let tree = create_test_tree();
        let main = tree.body().children().nth(1).unwrap();
        assert_eq!(main.text_content(), "Click here Some text");
    }

    #[test]
    fn test_to_json_round_trip() {
        let tree = create_test_tree();
        let json = tree.to_json().unwrap();

        assert!(json.contains("\"tag_name\": \"html\""));
        assert!(json.contains("nav-btn"));

        let reparsed = DomTree::from_json(&json).unwrap();
        assert_eq!(reparsed.count_elements(), tree.count_elements());
    }

    #[test]
    fn test_from_json_reports_parse_errors() {
        let err = DomTree::from_json("{not json").unwrap_err();
        assert!(matches!(err, InspectorError::DomParseFailed(_)));
    }
}
