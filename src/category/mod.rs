//! Practice-area classification by ordered keyword matching.
//!
//! Deliberately a cheap heuristic rather than a trained classifier: scan
//! order equals configuration order, so earlier categories take priority on
//! ambiguous text. Known precision limitation, documented and tested.

use serde::{Deserialize, Serialize};

/// One practice area with its trigger phrases and accepted alias spellings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub label: String,
    /// Phrases whose presence assigns this category
    pub triggers: Vec<String>,
    /// Alternative spellings normalized to `label` when parsing model output
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Ordered mapping from practice-area label to trigger phrases.
///
/// Order is a contract: [`CategoryTable::detect`] returns the first entry
/// with a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTable {
    pub entries: Vec<CategoryEntry>,
}

impl CategoryTable {
    pub fn new(entries: Vec<CategoryEntry>) -> Self {
        Self { entries }
    }

    /// First configured category whose trigger set hits the text; `None`
    /// when nothing matches.
    pub fn detect(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .triggers
                    .iter()
                    .any(|trigger| text.contains(&trigger.to_lowercase()))
            })
            .map(|entry| entry.label.as_str())
    }

    /// Map a free-form label (e.g. from model output) onto a configured
    /// label, case-insensitively, honoring aliases.
    pub fn normalize(&self, raw: &str) -> Option<&str> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| {
                entry.label.to_lowercase() == needle
                    || entry
                        .aliases
                        .iter()
                        .any(|alias| alias.to_lowercase() == needle)
            })
            .map(|entry| entry.label.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CategoryTable {
    /// The practice areas of the lawyer directory, in priority order.
    fn default() -> Self {
        let entry = |label: &str, triggers: &[&str], aliases: &[&str]| CategoryEntry {
            label: label.to_string(),
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            entries: vec![
                entry(
                    "Family Law",
                    &["divorce", "marriage", "custody", "alimony", "wife", "husband"],
                    &["family"],
                ),
                entry(
                    "Property / Rent Law",
                    &["tenant", "landlord", "rent", "property", "lease", "flat", "real estate"],
                    &["property law", "rent law", "property"],
                ),
                entry(
                    "Criminal Law",
                    &["fir", "police", "bail", "theft", "assault", "murder", "crime"],
                    &["criminal"],
                ),
                entry(
                    "Labour / Employment Law",
                    &["salary", "employer", "terminated", "fired", "wages", "labour", "employment"],
                    &["employment law", "labour law"],
                ),
                entry(
                    "Cyber Law",
                    &["online", "social media", "hacking", "cyber", "phishing", "it act"],
                    &["cyber"],
                ),
                entry(
                    "Motor Vehicle Law",
                    &["accident", "driving licence", "vehicle", "traffic", "mv act"],
                    &["motor vehicle", "motor"],
                ),
                entry(
                    "Women's Rights",
                    &["harassment", "dowry", "domestic violence", "stalking"],
                    &["womens rights", "women's rights law"],
                ),
                entry(
                    "Mental Health Law",
                    &["mental health", "depression", "psychiatric"],
                    &["mental health"],
                ),
            ],
        }
    }
}
