//! Structural analysis of a single element
//!
//! The [`Analyzer`] composes the individual analyses into one [`AnalysisReport`]:
//! - [`structure`]: depth, sibling statistics and container signatures
//! - [`patterns`]: repeating structures, layout and interaction hints
//! - [`relationships`]: similar peers and semantically linked elements
//! - selectors from [`crate::dom::selector`]
//!
//! Analysis never fails from the caller's point of view: missing elements and
//! internal faults produce [`AnalysisReport::empty`].

pub mod attributes;
pub mod container;
pub mod kind;
pub mod patterns;
pub mod relationships;
pub mod report;
pub mod similarity;
pub mod structure;

pub use attributes::{Attribute, AttributeFilter};
pub use kind::ElementKind;
pub use patterns::{PatternReport, Relationship, RepeatingStructure};
pub use relationships::{RELATIONSHIP_THRESHOLD, RelationshipFinder};
pub use report::AnalysisReport;
pub use similarity::{ElementProfile, similarity};
pub use structure::{REPEATING_THRESHOLD, StructureReport};

use crate::dom::{DomTree, ElementRef, NodeId, SelectorPair};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

/// Entry point of the engine. Holds the relationship and pattern caches for
/// one session.
#[derive(Debug, Default)]
pub struct Analyzer {
    filter: AttributeFilter,
    finder: RelationshipFinder,
    patterns: HashMap<NodeId, PatternReport>,
    #[cfg(test)]
    fail_on: Option<NodeId>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a custom attribute policy
    pub fn with_filter(filter: AttributeFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn filter(&self) -> &AttributeFilter {
        &self.filter
    }

    pub fn relationship_finder(&self) -> &RelationshipFinder {
        &self.finder
    }

    /// Number of elements with memoized patterns
    pub fn cached_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// Analyze one element of `tree`.
    ///
    /// Returns the empty report when `node` is `None`, unknown to the tree or
    /// detached from it, and when any part of the analysis panics.
    pub fn analyze_element(&mut self, tree: &DomTree, node: Option<NodeId>) -> AnalysisReport {
        let Some(node) = node else {
            return AnalysisReport::empty();
        };
        let Some(element) = tree.element(node) else {
            log::debug!("Element {:?} is not attached to document {:?}", node, tree.id());
            return AnalysisReport::empty();
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.compose(element))) {
            Ok(report) => report,
            Err(cause) => {
                let message = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown cause".to_string());
                log::error!("Analysis of {:?} failed: {}", element, message);
                AnalysisReport::empty()
            }
        }
    }

    /// Forget memoized relationships and patterns
    pub fn reset(&mut self) {
        self.finder.clear();
        self.patterns.clear();
    }

    fn compose(&mut self, element: ElementRef<'_>) -> AnalysisReport {
        let kind = ElementKind::of(element);

        let structure = structure::analyze_structure(element);

        #[cfg(test)]
        if self.fail_on == Some(element.node_id()) {
            panic!("injected fault for {:?}", element);
        }

        let filter = &self.filter;
        let patterns = self
            .patterns
            .entry(element.node_id())
            .or_insert_with(|| patterns::find_patterns(element, kind, filter))
            .clone();
        let relationships = self.finder.relationships(element);
        let selectors = SelectorPair::for_element(element);

        AnalysisReport {
            structure: Some(structure),
            patterns,
            relationships,
            selectors: Some(selectors),
        }
    }
}
