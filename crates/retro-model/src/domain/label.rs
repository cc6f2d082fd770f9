use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

const DEPARTMENT_CLASSES: &[&str] = &[
    "Municipal Governance & Community Services",
    "Education, Health & Social Welfare",
    "Infrastructure, Utilities & Natural Resources",
    "Security & Law Enforcement",
];

const URGENCY_CLASSES: &[&str] = &["NORMAL", "URGENT", "HIGHLY URGENT"];

/// Classification task routed by a dedicated model.
///
/// Every label owns an independent pipeline: its own threshold, dataset, retrain job and champion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Routes a grievance to the responsible department.
    Department,
    /// Estimates how urgent a grievance is.
    Urgency,
}

impl Label {
    /// All labels in evaluation order.
    pub const ALL: [Label; 2] = [Label::Department, Label::Urgency];

    /// Returns the label as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Department => "department",
            Label::Urgency => "urgency",
        }
    }

    /// Class names in model output order (index == class id).
    pub fn classes(&self) -> &'static [&'static str] {
        match self {
            Label::Department => DEPARTMENT_CLASSES,
            Label::Urgency => URGENCY_CLASSES,
        }
    }

    /// Resolve a predicted label to a class id.
    ///
    /// Accepts either an exact class name or a numeric class id within range.
    pub fn class_index(&self, raw: &str) -> Option<usize> {
        let classes = self.classes();
        if let Some(idx) = classes.iter().position(|c| *c == raw) {
            return Some(idx);
        }
        raw.trim()
            .parse::<usize>()
            .ok()
            .filter(|idx| *idx < classes.len())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "department" | "dept" => Ok(Label::Department),
            "urgency" => Ok(Label::Urgency),
            other => Err(ModelError::UnknownLabel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitive_and_alias() {
        assert_eq!("Department".parse::<Label>().unwrap(), Label::Department);
        assert_eq!("dept".parse::<Label>().unwrap(), Label::Department);
        assert_eq!(" URGENCY ".parse::<Label>().unwrap(), Label::Urgency);
    }

    #[test]
    fn rejects_unknown_label() {
        let err = "sentiment".parse::<Label>().unwrap_err();
        assert!(matches!(err, ModelError::UnknownLabel(ref s) if s == "sentiment"));
    }

    #[test]
    fn class_index_accepts_names_and_ids() {
        assert_eq!(Label::Urgency.class_index("HIGHLY URGENT"), Some(2));
        assert_eq!(Label::Urgency.class_index("1"), Some(1));
        assert_eq!(Label::Urgency.class_index("3"), None);
        assert_eq!(Label::Urgency.class_index("urgent"), None);
        assert_eq!(
            Label::Department.class_index("Security & Law Enforcement"),
            Some(3)
        );
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Label::Urgency).unwrap();
        assert_eq!(json, r#""urgency""#);
        let parsed: Label = serde_json::from_str(r#""department""#).unwrap();
        assert_eq!(parsed, Label::Department);
    }
}
