//! Usage descriptor extraction.
//!
//! Looks for phrases such as "para piel grasa" or "cabello teñido" in a
//! normalized description and turns them into a short label ("Piel Grasa",
//! "Cabello Teñido") used in titles and descriptions.
//!
//! Patterns are tried in the fixed order of [`USAGE_PATTERNS`]: skin before
//! hair. The leftmost match of the first pattern that matches wins.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// What a usage descriptor applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageCategory {
    Skin,
    Hair,
}

impl UsageCategory {
    /// Spanish label used in output text.
    pub fn label(&self) -> &'static str {
        match self {
            UsageCategory::Skin => "Piel",
            UsageCategory::Hair => "Cabello",
        }
    }
}

/// A skin-type or hair-type applicability fact, e.g. `Piel Grasa`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageDescriptor {
    pub category: UsageCategory,
    /// Title-cased qualifier, e.g. `Grasa` or `Con Acné`.
    pub qualifier: String,
}

impl fmt::Display for UsageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category.label(), self.qualifier)
    }
}

/// Ordered `(category, pattern)` table. Capture group 1 is the qualifier.
static USAGE_PATTERNS: Lazy<Vec<(UsageCategory, Regex)>> = Lazy::new(|| {
    vec![
        (
            UsageCategory::Skin,
            Regex::new(
                r"(?i)\b(?:para|piel)\s+(normal|grasa|seca|mixta|sensible|madura|con\s+acn[eé])\b",
            )
            .unwrap(),
        ),
        (
            UsageCategory::Hair,
            Regex::new(
                r"(?i)\b(?:para|cabello)\s+(graso|seco|dañado|teñido|rizado|lacio|fino)\b",
            )
            .unwrap(),
        ),
    ]
});

/// Extract the first usage descriptor from normalized description text.
pub fn extract_usage(description: &str) -> Option<UsageDescriptor> {
    if description.trim().is_empty() {
        return None;
    }
    USAGE_PATTERNS.iter().find_map(|(category, pattern)| {
        let qualifier = pattern.captures(description)?.get(1)?.as_str();
        Some(UsageDescriptor {
            category: *category,
            qualifier: title_case(qualifier),
        })
    })
}

/// Capitalize each whitespace-separated word, lowercasing the rest.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
