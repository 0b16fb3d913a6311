//! Ranking of professional (lawyer) suggestions for a detected category.
//!
//! Candidates come from the external directory store; this module only
//! orders and truncates them, it never mutates the records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A professional as supplied by the external store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalCandidate {
    pub id: Uuid,
    pub full_name: String,
    pub city: String,
    /// Free-form specialization text, e.g. "Family Law", "property disputes"
    pub practice_area: String,
    pub experience_years: u32,
    pub hourly_rate: f64,
    /// Absent when the professional has no reviews yet
    pub average_rating: Option<f32>,
    pub review_count: u32,
}

impl ProfessionalCandidate {
    /// Ranking rating: professionals without reviews rank at 0.0 so they
    /// sort last deterministically instead of floating on a null.
    fn effective_rating(&self) -> f32 {
        if self.review_count == 0 {
            return 0.0;
        }
        self.average_rating.unwrap_or(0.0)
    }
}

/// Ranks candidates for a category: filter by practice area, order by
/// rating then experience, truncate.
#[derive(Debug, Clone)]
pub struct ProfessionalMatcher {
    max_suggestions: usize,
}

impl ProfessionalMatcher {
    pub fn new(max_suggestions: usize) -> Self {
        Self { max_suggestions }
    }

    /// Suggest up to `max_suggestions` professionals.
    ///
    /// Filtering is a case-insensitive substring match between the category
    /// and the practice-area text (either direction, plus category words so
    /// "Property / Rent Law" still matches a "rent disputes" specialist).
    /// A null category, or a filter that matches nobody, falls back to the
    /// unfiltered candidate set. The ordering is total, so identical input
    /// always produces identical output.
    pub fn suggest(
        &self,
        category: Option<&str>,
        candidates: &[ProfessionalCandidate],
    ) -> Vec<ProfessionalCandidate> {
        let mut pool: Vec<&ProfessionalCandidate> = match category {
            Some(category) => {
                let matched: Vec<&ProfessionalCandidate> = candidates
                    .iter()
                    .filter(|c| practice_matches(category, &c.practice_area))
                    .collect();
                if matched.is_empty() {
                    candidates.iter().collect()
                } else {
                    matched
                }
            }
            None => candidates.iter().collect(),
        };

        pool.sort_by(|a, b| {
            b.effective_rating()
                .total_cmp(&a.effective_rating())
                .then(b.experience_years.cmp(&a.experience_years))
                .then(a.id.cmp(&b.id))
        });
        pool.truncate(self.max_suggestions);

        pool.into_iter().cloned().collect()
    }
}

/// Generic words that appear in almost every practice-area label and carry
/// no discriminating signal
const GENERIC_TERMS: [&str; 2] = ["law", "laws"];

fn practice_matches(category: &str, practice_area: &str) -> bool {
    let category_l = category.to_lowercase();
    let practice_l = practice_area.to_lowercase();

    if practice_l.contains(&category_l) || category_l.contains(&practice_l) {
        return true;
    }

    category_l
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 3 && !GENERIC_TERMS.contains(word))
        .any(|word| practice_l.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        name: &str,
        practice: &str,
        experience: u32,
        rating: Option<f32>,
        reviews: u32,
    ) -> ProfessionalCandidate {
        // Fixed ids keep the final tie-break reproducible in assertions.
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
        ProfessionalCandidate {
            id,
            full_name: name.to_string(),
            city: "Mumbai".to_string(),
            practice_area: practice.to_string(),
            experience_years: experience,
            hourly_rate: 100.0,
            average_rating: rating,
            review_count: reviews,
        }
    }

    #[test]
    fn test_rating_then_experience_ordering() {
        let candidates = vec![
            candidate("A", "Family Law", 3, Some(4.5), 12),
            candidate("B", "Family Law", 10, None, 0),
            candidate("C", "Family Law", 8, Some(4.5), 7),
        ];

        let matcher = ProfessionalMatcher::new(5);
        let ranked = matcher.suggest(Some("Family Law"), &candidates);

        let names: Vec<&str> = ranked.iter().map(|c| c.full_name.as_str()).collect();
        // Both 4.5-rated first, higher experience ahead; the unreviewed
        // candidate sorts last despite the most experience.
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_zero_reviews_rank_as_zero_rating() {
        let candidates = vec![
            candidate("Stale", "Criminal Law", 20, Some(5.0), 0),
            candidate("Reviewed", "Criminal Law", 1, Some(3.0), 4),
        ];
        let ranked = ProfessionalMatcher::new(5).suggest(Some("Criminal Law"), &candidates);
        assert_eq!(ranked[0].full_name, "Reviewed");
    }

    #[test]
    fn test_category_filter_substring() {
        let candidates = vec![
            candidate("Fam", "Family Law", 5, Some(4.0), 3),
            candidate("Rent", "rent disputes and tenancy", 5, Some(4.8), 9),
        ];
        let ranked = ProfessionalMatcher::new(5).suggest(Some("Property / Rent Law"), &candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].full_name, "Rent");
    }

    #[test]
    fn test_null_category_uses_all_candidates() {
        let candidates = vec![
            candidate("A", "Family Law", 5, Some(4.0), 3),
            candidate("B", "Cyber Law", 5, Some(4.5), 3),
        ];
        let ranked = ProfessionalMatcher::new(5).suggest(None, &candidates);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].full_name, "B");
    }

    #[test]
    fn test_unmatched_category_falls_back_unfiltered() {
        let candidates = vec![
            candidate("A", "Family Law", 5, Some(4.0), 3),
            candidate("B", "Cyber Law", 2, Some(3.0), 1),
        ];
        let ranked = ProfessionalMatcher::new(5).suggest(Some("Maritime Law"), &candidates);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_truncation() {
        let candidates: Vec<ProfessionalCandidate> = (0..10)
            .map(|i| candidate(&format!("L{}", i), "Family Law", i, Some(4.0), 2))
            .collect();
        let ranked = ProfessionalMatcher::new(5).suggest(Some("Family Law"), &candidates);
        assert_eq!(ranked.len(), 5);
    }

    #[test]
    fn test_ranking_is_reproducible() {
        let candidates = vec![
            candidate("A", "Family Law", 5, Some(4.0), 3),
            candidate("B", "Family Law", 5, Some(4.0), 3),
            candidate("C", "Family Law", 5, Some(4.0), 3),
        ];
        let matcher = ProfessionalMatcher::new(5);
        let first = matcher.suggest(Some("Family Law"), &candidates);
        let second = matcher.suggest(Some("Family Law"), &candidates);
        let ids1: Vec<Uuid> = first.iter().map(|c| c.id).collect();
        let ids2: Vec<Uuid> = second.iter().map(|c| c.id).collect();
        assert_eq!(ids1, ids2);
    }
}
