use crate::analysis::attributes::AttributeFilter;
use crate::analysis::kind::ElementKind;
use crate::analysis::relationships::RELATIONSHIP_THRESHOLD;
use crate::analysis::similarity::ElementProfile;
use crate::dom::{ElementRef, NodeId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Cap on document-wide matches reported as `related`
const MAX_RELATED: usize = 10;

const CLICKABLE_ROLES: &[&str] = &["button", "link", "tab", "menuitem"];

/// How a repeating structure relates to the analyzed element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Sibling,
    Parent,
    Child,
    Related,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatingStructure {
    pub element: NodeId,
    pub similarity: f64,
    pub relationship: Relationship,
}

/// Repetition, layout and interaction patterns around an element
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    /// In discovery order: siblings (child order), parent, children, then document matches
    pub repeating_structures: Vec<RepeatingStructure>,

    /// Relevant attribute names the element shares with every sibling repeat
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub common_attributes: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_pattern: Option<String>,
}

/// Detect patterns for `element`, classified as `kind`
pub fn find_patterns(element: ElementRef<'_>, kind: ElementKind, filter: &AttributeFilter) -> PatternReport {
    let profile = ElementProfile::new(element);
    let repeating_structures = repeating_structures(&profile);

    let sibling_repeats: Vec<ElementRef<'_>> = repeating_structures
        .iter()
        .filter(|repeat| repeat.relationship == Relationship::Sibling)
        .filter_map(|repeat| element.tree().element(repeat.element))
        .collect();

    PatternReport {
        common_attributes: common_attributes(element, &sibling_repeats, filter),
        layout_pattern: layout_pattern(element, kind).map(str::to_string),
        interaction_pattern: interaction_pattern(element, kind).map(str::to_string),
        repeating_structures,
    }
}

fn repeating_structures(profile: &ElementProfile<'_>) -> Vec<RepeatingStructure> {
    let element = profile.element();
    let mut found = Vec::new();

    let mut nearby = Vec::new();
    if let Some(parent) = element.parent() {
        nearby.extend(
            parent
                .children()
                .filter(|sibling| !sibling.same_as(&element))
                .map(|sibling| (sibling, Relationship::Sibling)),
        );
        nearby.push((parent, Relationship::Parent));
    }
    nearby.extend(element.children().map(|child| (child, Relationship::Child)));

    for (candidate, relationship) in nearby {
        let similarity = profile.similarity_to(candidate);
        if similarity > RELATIONSHIP_THRESHOLD {
            found.push(RepeatingStructure {
                element: candidate.node_id(),
                similarity,
                relationship,
            });
        }
    }

    // Same structure elsewhere in the document, reusing the element's signature
    let nearby: BTreeSet<NodeId> = found.iter().map(|repeat| repeat.element).collect();
    let matches = element
        .tree()
        .elements()
        .filter(|candidate| !candidate.same_as(&element) && !nearby.contains(&candidate.node_id()))
        .filter(|candidate| ElementProfile::new(*candidate).signature() == profile.signature())
        .take(MAX_RELATED)
        .collect::<Vec<_>>();

    for candidate in matches {
        found.push(RepeatingStructure {
            element: candidate.node_id(),
            similarity: profile.similarity_to(candidate),
            relationship: Relationship::Related,
        });
    }

    found
}

fn common_attributes(element: ElementRef<'_>, repeats: &[ElementRef<'_>], filter: &AttributeFilter) -> BTreeSet<String> {
    if repeats.is_empty() {
        return BTreeSet::new();
    }

    let names = |el: ElementRef<'_>| -> BTreeSet<String> {
        filter.relevant_attributes(el).into_iter().map(|attr| attr.name).collect()
    };

    repeats.iter().fold(names(element), |shared, repeat| {
        let theirs = names(*repeat);
        shared.intersection(&theirs).cloned().collect()
    })
}

fn layout_pattern(element: ElementRef<'_>, kind: ElementKind) -> Option<&'static str> {
    match element.computed_display() {
        Some("flex" | "inline-flex") => return Some("flex-container"),
        Some("grid" | "inline-grid") => return Some("grid-container"),
        Some("table") => return Some("table"),
        _ => {}
    }

    match element.parent().and_then(|parent| parent.computed_display()) {
        Some("flex" | "inline-flex") => return Some("flex-item"),
        Some("grid" | "inline-grid") => return Some("grid-item"),
        _ => {}
    }

    match kind {
        ElementKind::ListItem => Some("list-item"),
        ElementKind::TableCell => Some("table-cell"),
        ElementKind::List => Some("list"),
        _ => None,
    }
}

fn interaction_pattern(element: ElementRef<'_>, kind: ElementKind) -> Option<&'static str> {
    match kind {
        ElementKind::Link => return Some("navigation"),
        ElementKind::Button => return Some("clickable"),
        ElementKind::FormControl => return Some("form-input"),
        _ => {}
    }

    let has_handler = element.attributes().any(|(name, _)| name.starts_with("on"));
    let has_clickable_role = element.role().is_some_and(|role| CLICKABLE_ROLES.contains(&role));
    if has_handler || has_clickable_role {
        return Some("clickable");
    }

    element.has_attribute("tabindex").then_some("focusable")
}
