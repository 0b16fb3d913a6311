//! Parsing of raw model output into answer body and detected category

use crate::category::CategoryTable;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserBuildError {
    #[error("Invalid marker pattern: {0}")]
    InvalidMarker(#[from] regex::Error),
}

/// The parsed reply. Parsing itself never fails: ambiguity and malformed
/// markers resolve through the fallback chain, and the caller always gets
/// an answer body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnswer {
    pub body: String,
    pub category: Option<String>,
}

/// Locates the configured category marker in model output.
///
/// The marker's last occurrence splits the text: everything before it is the
/// answer body, the token after it is the category claim. A claim only
/// overrides keyword detection when it normalizes to a configured label;
/// with several markers, occurrences are scanned from the last backwards for
/// the first well-formed one.
pub struct AnswerParser {
    pattern: Regex,
}

impl AnswerParser {
    pub fn new(marker: &str) -> Result<Self, ParserBuildError> {
        let pattern = Regex::new(&format!(
            r"(?i){}[ \t]*([A-Za-z /'&-]*)",
            regex::escape(marker)
        ))?;
        Ok(Self { pattern })
    }

    pub fn parse(
        &self,
        raw: &str,
        categories: &CategoryTable,
        keyword_fallback: Option<&str>,
    ) -> ParsedAnswer {
        let matches: Vec<(usize, String)> = self
            .pattern
            .captures_iter(raw)
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                let token = caps.get(1)?.as_str();
                Some((start, token.to_string()))
            })
            .collect();

        let Some((last_start, _)) = matches.last() else {
            return ParsedAnswer {
                body: raw.trim().to_string(),
                category: keyword_fallback.map(|c| c.to_string()),
            };
        };

        // Last well-formed occurrence wins and becomes the split point; with
        // none well-formed, the last occurrence still gets stripped from the
        // body and the keyword fallback supplies the category.
        let well_formed = matches.iter().rev().find_map(|(start, token)| {
            let cleaned = token.trim().trim_matches(|c| c == '*' || c == '_');
            categories
                .normalize(cleaned)
                .map(|label| (*start, label.to_string()))
        });

        match well_formed {
            Some((start, label)) => ParsedAnswer {
                body: raw[..start].trim().to_string(),
                category: Some(label),
            },
            None => ParsedAnswer {
                body: raw[..*last_start].trim().to_string(),
                category: keyword_fallback.map(|c| c.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> AnswerParser {
        AnswerParser::new("Detected Legal Category:").unwrap()
    }

    fn table() -> CategoryTable {
        CategoryTable::default()
    }

    #[test]
    fn test_marker_splits_body_and_category() {
        let raw = "You can file a complaint with the police.\n\nDetected Legal Category: Criminal Law";
        let parsed = parser().parse(raw, &table(), None);
        assert_eq!(parsed.body, "You can file a complaint with the police.");
        assert_eq!(parsed.category.as_deref(), Some("Criminal Law"));
    }

    #[test]
    fn test_marker_is_case_insensitive_and_normalizes() {
        let raw = "Answer text.\ndetected legal category: CRIMINAL LAW";
        let parsed = parser().parse(raw, &table(), None);
        assert_eq!(parsed.category.as_deref(), Some("Criminal Law"));
    }

    #[test]
    fn test_alias_normalization() {
        let raw = "Answer.\nDetected Legal Category: Property Law";
        let parsed = parser().parse(raw, &table(), None);
        assert_eq!(parsed.category.as_deref(), Some("Property / Rent Law"));
    }

    #[test]
    fn test_decorated_token() {
        let raw = "Answer.\nDetected Legal Category: **Family Law**";
        let parsed = parser().parse(raw, &table(), None);
        assert_eq!(parsed.category.as_deref(), Some("Family Law"));
    }

    #[test]
    fn test_absent_marker_falls_back_to_keywords() {
        let raw = "The notice period depends on the rental agreement.";
        let parsed = parser().parse(raw, &table(), Some("Property / Rent Law"));
        assert_eq!(parsed.body, raw);
        assert_eq!(parsed.category.as_deref(), Some("Property / Rent Law"));
    }

    #[test]
    fn test_unknown_token_falls_back() {
        let raw = "Answer.\nDetected Legal Category: Maritime Law";
        let parsed = parser().parse(raw, &table(), Some("Cyber Law"));
        assert_eq!(parsed.body, "Answer.");
        assert_eq!(parsed.category.as_deref(), Some("Cyber Law"));
    }

    #[test]
    fn test_multiple_markers_take_last_well_formed() {
        let raw = "Discussing Detected Legal Category: lines in answers.\n\
                   Real answer here.\n\
                   Detected Legal Category: Family Law\n\
                   Detected Legal Category: gibberish12";
        let parsed = parser().parse(raw, &table(), None);
        // The trailing marker's token is malformed; the previous one wins.
        assert_eq!(parsed.category.as_deref(), Some("Family Law"));
        assert!(parsed.body.contains("Real answer here."));
        assert!(!parsed.body.contains("Family Law\nDetected"));
    }

    #[test]
    fn test_no_category_anywhere() {
        let raw = "General guidance only.";
        let parsed = parser().parse(raw, &table(), None);
        assert_eq!(parsed.body, raw);
        assert_eq!(parsed.category, None);
    }
}
