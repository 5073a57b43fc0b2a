use crate::analysis::container::{below_body, container_signature, is_likely_container};
use crate::analysis::similarity::ElementProfile;
use crate::dom::ElementRef;
use serde::Serialize;

/// Minimum similarity for a sibling to count as a repeat of the element.
///
/// Deliberately stricter than the relationship threshold.
pub const REPEATING_THRESHOLD: f64 = 0.8;

/// Position of an element in the document structure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    /// Steps from the element up to, but excluding, the body
    pub depth: usize,

    /// Children of the parent, the element included
    pub sibling_count: usize,

    /// Siblings scoring above [`REPEATING_THRESHOLD`]
    pub similar_sibling_count: usize,

    pub child_count: usize,

    /// Always `similar_sibling_count > 0`
    pub is_repeating: bool,

    /// Signature of the nearest container ancestor below the body
    pub container_signature: Option<String>,

    /// Signature of the nearest container holding repeats of the element's branch
    pub pattern_group_signature: Option<String>,
}

/// Summarize where the element sits in the tree
pub fn analyze_structure(element: ElementRef<'_>) -> StructureReport {
    let depth = std::iter::once(element)
        .chain(element.ancestors())
        .take_while(|el| !el.is_body())
        .count();

    let profile = ElementProfile::new(element);
    let (sibling_count, similar_sibling_count) = match element.parent() {
        Some(parent) => (parent.child_count(), count_similar_siblings(&profile, parent)),
        None => (0, 0),
    };

    let container_signature = below_body(element)
        .find(|ancestor| is_likely_container(*ancestor))
        .map(container_signature);

    let is_repeating = similar_sibling_count > 0;
    let pattern_group_signature = if is_repeating {
        pattern_group_signature(element)
    } else {
        None
    };

    StructureReport {
        depth,
        sibling_count,
        similar_sibling_count,
        child_count: element.child_count(),
        is_repeating,
        container_signature,
        pattern_group_signature,
    }
}

fn count_similar_siblings(profile: &ElementProfile<'_>, parent: ElementRef<'_>) -> usize {
    parent
        .children()
        .filter(|sibling| !sibling.same_as(&profile.element()))
        .filter(|sibling| profile.similarity_to(*sibling) > REPEATING_THRESHOLD)
        .count()
}

/// Walk up from the element; the first container whose child on our path has
/// a strongly similar sibling names the pattern group.
fn pattern_group_signature(element: ElementRef<'_>) -> Option<String> {
    let mut branch = element;
    for ancestor in below_body(element) {
        if is_likely_container(ancestor) {
            let profile = ElementProfile::new(branch);
            if count_similar_siblings(&profile, ancestor) > 0 {
                return Some(container_signature(ancestor));
            }
        }
        branch = ancestor;
    }
    None
}
