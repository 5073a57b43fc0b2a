use crate::dom::ElementRef;
use serde::{Deserialize, Serialize};

/// Attributes dropped regardless of configuration
const ALWAYS_EXCLUDED: [&str; 3] = ["id", "class", "style"];

/// One identifying attribute of an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Decides which attributes identify an element and which are noise.
///
/// The exclusion lists are a configuration surface; `id`, `class` and
/// `style` are always excluded on top of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AttributeFilter {
    /// Exact attribute names to drop
    pub excluded_names: Vec<String>,

    /// Attribute name prefixes to drop (framework scoping, render markers, directives)
    pub excluded_prefixes: Vec<String>,

    /// Attributes stable enough to disambiguate selectors
    pub identifying: Vec<String>,
}

impl Default for AttributeFilter {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            excluded_names: owned(&["id", "class", "style"]),
            excluded_prefixes: owned(&[
                "aria-",
                // Vue scoped styles
                "data-v-",
                // Angular render markers
                "_ngcontent-",
                "_nghost-",
                // React render markers
                "data-reactid",
                "data-reactroot",
                // Directive bindings
                "ng-",
                "v-",
                "x-",
                ":",
                "@",
            ]),
            identifying: owned(&[
                "name",
                "type",
                "role",
                "data-testid",
                "data-test-id",
                "data-test",
                "data-cy",
                "data-qa",
            ]),
        }
    }
}

impl AttributeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: drop another attribute name prefix
    pub fn with_excluded_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_prefixes.push(prefix.into());
        self
    }

    /// Builder method: drop another exact attribute name
    pub fn with_excluded_name(mut self, name: impl Into<String>) -> Self {
        self.excluded_names.push(name.into());
        self
    }

    /// Builder method: mark another attribute as identifying
    pub fn with_identifying(mut self, name: impl Into<String>) -> Self {
        self.identifying.push(name.into());
        self
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        ALWAYS_EXCLUDED.contains(&name.as_str())
            || self.excluded_names.iter().any(|excluded| excluded.eq_ignore_ascii_case(&name))
            || self.excluded_prefixes.iter().any(|prefix| name.starts_with(&prefix.to_ascii_lowercase()))
    }

    /// Whether an attribute is suitable for disambiguating selectors
    pub fn is_identifying_attribute(&self, name: &str) -> bool {
        self.identifying.iter().any(|allowed| allowed.eq_ignore_ascii_case(name))
    }

    /// Attributes of `el` that survive the exclusion policy, in document order
    pub fn relevant_attributes(&self, el: ElementRef<'_>) -> Vec<Attribute> {
        el.attributes()
            .filter(|(name, _)| !self.is_excluded(name))
            .map(|(name, value)| Attribute {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect()
    }
}
