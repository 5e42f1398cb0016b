use std::fmt;

use serde::{Deserialize, Serialize};

/// Known templates as (id, label, description), in picker order.
pub const TEMPLATES: &[(&str, &str, &str)] = &[
    ("modern", "Modern", "Bold header, colored accents"),
    ("classic", "Classic", "Traditional single-column"),
    ("minimal", "Minimal", "Clean whitespace, subtle style"),
    ("creative", "Creative", "Sidebar layout with accent color"),
    ("executive", "Executive", "Understated serif, leadership focus"),
    ("professional", "Professional", "Two-tone header, dense sections"),
];

/// Template identifier of a resume.
///
/// The set of templates is closed, but identifiers written by a newer client are kept
/// verbatim in `Other` instead of being rejected. Renderers call [`TemplateId::resolve`]
/// to get a template they can actually draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TemplateId {
    #[default]
    Modern,
    Classic,
    Minimal,
    Creative,
    Executive,
    Professional,
    Other(String),
}

impl TemplateId {
    pub fn as_str(&self) -> &str {
        match self {
            TemplateId::Modern => "modern",
            TemplateId::Classic => "classic",
            TemplateId::Minimal => "minimal",
            TemplateId::Creative => "creative",
            TemplateId::Executive => "executive",
            TemplateId::Professional => "professional",
            TemplateId::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TemplateId::Other(_))
    }

    /// The template to render: itself when known, the default otherwise.
    pub fn resolve(&self) -> TemplateId {
        if self.is_known() {
            self.clone()
        } else {
            TemplateId::default()
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        TEMPLATES
            .iter()
            .find(|(id, _, _)| *id == self.as_str())
            .map(|(_, label, _)| *label)
    }
}

impl From<String> for TemplateId {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "modern" => TemplateId::Modern,
            "classic" => TemplateId::Classic,
            "minimal" => TemplateId::Minimal,
            "creative" => TemplateId::Creative,
            "executive" => TemplateId::Executive,
            "professional" => TemplateId::Professional,
            _ => TemplateId::Other(raw),
        }
    }
}

impl From<&str> for TemplateId {
    fn from(raw: &str) -> Self {
        TemplateId::from(raw.to_string())
    }
}

impl From<TemplateId> for String {
    fn from(template: TemplateId) -> Self {
        match template {
            TemplateId::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_round_trip_through_strings() {
        for (id, _, _) in TEMPLATES {
            let template = TemplateId::from(*id);
            assert!(template.is_known(), "{id} should be known");
            assert_eq!(String::from(template), *id);
        }
    }

    #[test]
    fn test_unknown_id_is_preserved() {
        let template: TemplateId = serde_json::from_str("\"neon\"").unwrap();
        assert_eq!(template, TemplateId::Other("neon".to_string()));
        assert_eq!(serde_json::to_string(&template).unwrap(), "\"neon\"");
    }

    #[test]
    fn test_unknown_id_resolves_to_default() {
        assert_eq!(TemplateId::from("neon").resolve(), TemplateId::Modern);
        assert_eq!(TemplateId::Classic.resolve(), TemplateId::Classic);
    }

    #[test]
    fn test_label_lookup() {
        assert_eq!(TemplateId::Minimal.label(), Some("Minimal"));
        assert_eq!(TemplateId::from("neon").label(), None);
    }
}
