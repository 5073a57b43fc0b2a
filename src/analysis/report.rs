use crate::analysis::patterns::PatternReport;
use crate::analysis::structure::StructureReport;
use crate::dom::{NodeId, SelectorPair};
use serde::{Serialize, Serializer};

/// Everything the engine knows about one element.
///
/// Absent sections serialize as `{}` so consumers can always index into them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(serialize_with = "object_or_empty")]
    pub structure: Option<StructureReport>,

    pub patterns: PatternReport,

    pub relationships: Vec<NodeId>,

    #[serde(serialize_with = "object_or_empty")]
    pub selectors: Option<SelectorPair>,
}

impl AnalysisReport {
    /// The report returned for missing elements and failed analyses
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::empty()
    }

    /// Serialize to a JSON value; an unserializable report degrades to the empty shape
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            log::warn!("Failed to serialize analysis report: {}", e);
            serde_json::json!({
                "structure": {},
                "patterns": { "repeatingStructures": [] },
                "relationships": [],
                "selectors": {}
            })
        })
    }
}

fn object_or_empty<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(inner) => inner.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_shape() {
        let json = serde_json::to_string(&AnalysisReport::empty()).unwrap();
        assert_eq!(
            json,
            r#"{"structure":{},"patterns":{"repeatingStructures":[]},"relationships":[],"selectors":{}}"#
        );
    }

    #[test]
    fn test_to_value_matches_serde() {
        let report = AnalysisReport::empty();
        assert_eq!(report.to_value(), serde_json::to_value(&report).unwrap());
        assert!(report.is_empty());
    }

    #[test]
    fn test_selectors_serialize_inline() {
        let report = AnalysisReport {
            selectors: Some(SelectorPair {
                css: "#main".to_string(),
                xpath: "//*[@id=\"main\"]".to_string(),
            }),
            ..AnalysisReport::empty()
        };
        let json = report.to_value();
        assert_eq!(json["selectors"]["css"], "#main");
        assert!(!report.is_empty());
    }
}
