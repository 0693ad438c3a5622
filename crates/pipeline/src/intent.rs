//! Query intent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of question purposes the router can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    /// A specific fact from one regulation
    Lookup,
    /// How several regulations relate or differ
    Compare,
    /// A list of requirements or steps
    Checklist,
    /// A concept or term explained
    Explain,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::Lookup,
        Intent::Compare,
        Intent::Checklist,
        Intent::Explain,
    ];

    /// Parse a classifier label.
    ///
    /// Surrounding whitespace and case are normalised; anything else
    /// (punctuation, extra words) is not a label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "LOOKUP" => Some(Intent::Lookup),
            "COMPARE" => Some(Intent::Compare),
            "CHECKLIST" => Some(Intent::Checklist),
            "EXPLAIN" => Some(Intent::Explain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Lookup => "LOOKUP",
            Intent::Compare => "COMPARE",
            Intent::Checklist => "CHECKLIST",
            Intent::Explain => "EXPLAIN",
        }
    }

    /// Answer style the synthesizer asks for.
    pub fn style_directive(&self) -> &'static str {
        match self {
            Intent::Lookup => "Be concise and direct. Get to the point quickly.",
            Intent::Compare => "Use a structured format and compare point by point.",
            Intent::Checklist => "Return a numbered list of requirements or steps.",
            Intent::Explain => "Give a clear, thorough explanation and define key terms.",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_normalises_case_and_whitespace() {
        assert_eq!(Intent::from_label("LOOKUP"), Some(Intent::Lookup));
        assert_eq!(Intent::from_label("  compare\n"), Some(Intent::Compare));
        assert_eq!(Intent::from_label("Checklist"), Some(Intent::Checklist));
    }

    #[test]
    fn test_from_label_rejects_everything_else() {
        for label in ["MAYBE", "", "LOOKUP.", "Category: EXPLAIN", "LOOK UP"] {
            assert_eq!(Intent::from_label(label), None, "{}", label);
        }
    }

    #[test]
    fn test_round_trip_through_label() {
        for intent in Intent::ALL {
            assert_eq!(Intent::from_label(intent.as_str()), Some(intent));
        }
    }

    #[test]
    fn test_serializes_as_uppercase_label() {
        assert_eq!(
            serde_json::to_string(&Intent::Checklist).unwrap(),
            "\"CHECKLIST\""
        );
    }
}
