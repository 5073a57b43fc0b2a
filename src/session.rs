use crate::analysis::{AnalysisReport, Analyzer, AttributeFilter};
use crate::dom::{DomTree, ElementRef, NodeId};
use crate::error::{InspectorError, Result};
use crate::payload::ElementSelected;
use serde::Serialize;

/// Observable state of an [`InspectionSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Active,
}

/// Resources that only exist while inspecting
#[derive(Debug)]
struct ActiveInspection {
    analyzer: Analyzer,
    hovered: Option<NodeId>,
}

#[derive(Debug)]
enum State {
    Idle,
    Active(ActiveInspection),
}

/// Result of hovering an element: what the tooltip shows and the live analysis
#[derive(Debug, Clone)]
pub struct Hover {
    pub element: NodeId,
    pub label: String,
    pub report: AnalysisReport,
}

/// One user-driven inspection, from start to stop or selection.
///
/// The analyzer and its relationship cache are created when the session
/// becomes active and dropped when it returns to idle.
#[derive(Debug)]
pub struct InspectionSession {
    filter: AttributeFilter,
    state: State,
}

impl Default for InspectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectionSession {
    pub fn new() -> Self {
        Self::with_filter(AttributeFilter::default())
    }

    /// Create a session whose analyzers use a custom attribute policy
    pub fn with_filter(filter: AttributeFilter) -> Self {
        Self {
            filter,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.state {
            State::Idle => SessionState::Idle,
            State::Active(_) => SessionState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// The element hovered last, while active
    pub fn hovered(&self) -> Option<NodeId> {
        match &self.state {
            State::Active(active) => active.hovered,
            State::Idle => None,
        }
    }

    /// Memoized relationship entries held by the current analyzer
    pub fn cached_relationships(&self) -> usize {
        match &self.state {
            State::Active(active) => active.analyzer.relationship_finder().cached_len(),
            State::Idle => 0,
        }
    }

    /// Enter the active state with a fresh analyzer
    pub fn start(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(InspectorError::SessionAlreadyActive);
        }
        log::info!("Inspection started");
        self.state = State::Active(ActiveInspection {
            analyzer: Analyzer::with_filter(self.filter.clone()),
            hovered: None,
        });
        Ok(())
    }

    /// Leave the active state without selecting anything
    pub fn stop(&mut self) -> Result<()> {
        self.exit().map(|_| ())
    }

    /// Analyze the element under the pointer
    pub fn hover(&mut self, tree: &DomTree, node: NodeId) -> Result<Hover> {
        let State::Active(active) = &mut self.state else {
            return Err(InspectorError::SessionInactive);
        };
        let element = resolve(tree, node)?;

        if active.hovered != Some(node) {
            log::trace!("Hovering {:?}", element);
            active.hovered = Some(node);
        }

        Ok(Hover {
            element: node,
            label: tooltip_label(element),
            report: active.analyzer.analyze_element(tree, Some(node)),
        })
    }

    /// Finalize the selection and end the session.
    ///
    /// An element that no longer resolves leaves the session active.
    pub fn select(&mut self, tree: &DomTree, node: NodeId, url: &str) -> Result<ElementSelected> {
        let State::Active(active) = &mut self.state else {
            return Err(InspectorError::SessionInactive);
        };
        let element = resolve(tree, node)?;

        let report = active.analyzer.analyze_element(tree, Some(node));
        let event = ElementSelected::capture(element, &report, url);

        self.exit()?;
        log::info!("Selected {} at {}", event.css_selector, url);
        Ok(event)
    }

    fn exit(&mut self) -> Result<ActiveInspection> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Active(active) => {
                log::info!(
                    "Inspection stopped, dropping {} cached relationship sets",
                    active.analyzer.relationship_finder().cached_len()
                );
                Ok(active)
            }
            State::Idle => Err(InspectorError::SessionInactive),
        }
    }
}

fn resolve(tree: &DomTree, node: NodeId) -> Result<ElementRef<'_>> {
    tree.element(node)
        .ok_or_else(|| InspectorError::ElementNotFound(format!("node {} is not in the document", node.index())))
}

/// Short `tag#id.class` label shown next to the highlighted element
pub fn tooltip_label(element: ElementRef<'_>) -> String {
    let mut label = element.tag_name().to_string();
    if let Some(id) = element.id() {
        label.push('#');
        label.push_str(id);
    }
    for class in element.classes() {
        label.push('.');
        label.push_str(class);
    }
    label
}
