use crate::dom::ElementRef;
use std::collections::BTreeSet;

/// Coarse structural-equality key: tag, class list and sorted child tags
pub fn structure_signature(el: ElementRef<'_>) -> String {
    let mut child_tags: Vec<&str> = el.children().map(|child| child.tag_name()).collect();
    child_tags.sort_unstable();

    format!(
        "{}|{}|{}",
        el.tag_name(),
        el.classes().collect::<Vec<_>>().join(" "),
        child_tags.join(",")
    )
}

/// Precomputed comparison inputs for one element.
///
/// Scans compare one target against many candidates; building the target's
/// profile once avoids recomputing its signature per candidate.
#[derive(Debug, Clone)]
pub struct ElementProfile<'a> {
    element: ElementRef<'a>,
    classes: BTreeSet<&'a str>,
    signature: String,
}

impl<'a> ElementProfile<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self {
            element,
            classes: element.classes().collect(),
            signature: structure_signature(element),
        }
    }

    pub fn element(&self) -> ElementRef<'a> {
        self.element
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Similarity in `[0, 1]`: the mean of tag equality, class overlap and
    /// signature equality. An element compared with itself scores exactly 1.
    pub fn similarity(&self, other: &ElementProfile<'_>) -> f64 {
        if self.element.same_as(&other.element) {
            return 1.0;
        }

        let mut score = 0.0;
        if self.element.tag_name() == other.element.tag_name() {
            score += 1.0;
        }
        score += class_overlap(&self.classes, &other.classes);
        if self.signature == other.signature {
            score += 1.0;
        }
        score / 3.0
    }

    /// Similarity against an element without a prebuilt profile
    pub fn similarity_to(&self, other: ElementRef<'_>) -> f64 {
        self.similarity(&ElementProfile::new(other))
    }
}

fn class_overlap(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let largest = a.len().max(b.len());
    if largest == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / largest as f64
}

/// Similarity between two elements, see [`ElementProfile::similarity`]
pub fn similarity(a: ElementRef<'_>, b: ElementRef<'_>) -> f64 {
    ElementProfile::new(a).similarity_to(b)
}
