//! Weighted-field relevance scoring for knowledge search.
//!
//! Substring matching over a handful of weighted fields, normalized into
//! [0.0, 1.0]. Deliberately low-cost: the corpus is small and hand-curated,
//! so recall matters more than precision tuning. The weights and the
//! normalization formula are behavioral constants; change them and every
//! strong-match threshold downstream shifts meaning.

use super::Card;

/// Per-field weights, highest-signal fields first.
pub const WEIGHT_TITLE: u32 = 4;
pub const WEIGHT_TAGS: u32 = 3;
pub const WEIGHT_ARABIC: u32 = 2;
pub const WEIGHT_TRANSLATION: u32 = 2;
pub const WEIGHT_EXPLANATION: u32 = 1;
pub const WEIGHT_SOURCE_NAME: u32 = 1;
pub const WEIGHT_REFERENCE: u32 = 1;

/// Sum of all field weights; the denominator of score normalization.
pub const TOTAL_WEIGHT: u32 = WEIGHT_TITLE
    + WEIGHT_TAGS
    + WEIGHT_ARABIC
    + WEIGHT_TRANSLATION
    + WEIGHT_EXPLANATION
    + WEIGHT_SOURCE_NAME
    + WEIGHT_REFERENCE;

/// A title containing the full query verbatim scores at least this much.
pub const TITLE_MATCH_FLOOR: f32 = 0.9;

/// Split a query on whitespace, lowercase the tokens, drop empty ones.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Score one card against pre-tokenized query terms.
///
/// `full_query` is the trimmed, lowercased, untokenized query used for the
/// title boost. Returns 0.0 when no token touches any field.
pub fn score_card(card: &Card, tokens: &[String], full_query: &str) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }

    // Lowercase each field once, not once per token.
    let title = card.title.to_lowercase();
    let fields: [(Option<String>, u32); 7] = [
        (Some(title.clone()), WEIGHT_TITLE),
        (card.tags.as_deref().map(str::to_lowercase), WEIGHT_TAGS),
        (card.arabic.as_deref().map(str::to_lowercase), WEIGHT_ARABIC),
        (
            card.translation_en.as_deref().map(str::to_lowercase),
            WEIGHT_TRANSLATION,
        ),
        (
            card.explanation.as_deref().map(str::to_lowercase),
            WEIGHT_EXPLANATION,
        ),
        (Some(card.source_name.to_lowercase()), WEIGHT_SOURCE_NAME),
        (Some(card.reference.to_lowercase()), WEIGHT_REFERENCE),
    ];

    let mut raw: u32 = 0;
    for token in tokens {
        for (field, weight) in &fields {
            if let Some(text) = field {
                if text.contains(token.as_str()) {
                    raw += weight;
                }
            }
        }
    }

    let mut score = raw as f32 / (TOTAL_WEIGHT as f32 * tokens.len() as f32);
    score = score.min(1.0);

    // An exact topical match beats scattered keyword hits: a title containing
    // the whole query is raised to the floor, never lowered.
    if !full_query.is_empty() && title.contains(full_query) {
        score = score.max(TITLE_MATCH_FLOOR);
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, tags: Option<&str>) -> Card {
        Card {
            id: 1,
            kind: "ayah".into(),
            title: title.into(),
            arabic: None,
            translation_en: Some("Seek help through patience and prayer.".into()),
            explanation: None,
            source_name: "Quran".into(),
            reference: "2:153".into(),
            auth_grade: None,
            tags: tags.map(str::to_string),
            created_at: 0,
        }
    }

    #[test]
    fn tokenize_drops_empty_tokens_and_lowercases() {
        assert_eq!(tokenize("  Sabr   AND Prayer "), vec!["sabr", "and", "prayer"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn zero_tokens_score_zero() {
        let c = card("Allah is with the patient", None);
        assert_eq!(score_card(&c, &[], ""), 0.0);
    }

    #[test]
    fn unrelated_query_scores_zero() {
        let c = card("Allah is with the patient", Some("patience,sabr"));
        let tokens = tokenize("quantum chromodynamics");
        assert_eq!(score_card(&c, &tokens, "quantum chromodynamics"), 0.0);
    }

    #[test]
    fn exact_title_query_reaches_the_floor() {
        let c = card("Allah is with the patient", Some("patience,sabr"));
        let query = "allah is with the patient";
        let tokens = tokenize(query);
        let score = score_card(&c, &tokens, query);
        assert!(score >= TITLE_MATCH_FLOOR, "score {score} below floor");
    }

    #[test]
    fn boost_never_lowers_a_perfect_score() {
        // Every token hits every field: raw = 14 per token, normalized 1.0.
        let c = Card {
            id: 1,
            kind: "x".into(),
            title: "sabr".into(),
            arabic: Some("sabr".into()),
            translation_en: Some("sabr".into()),
            explanation: Some("sabr".into()),
            source_name: "sabr".into(),
            reference: "sabr".into(),
            auth_grade: None,
            tags: Some("sabr".into()),
            created_at: 0,
        };
        let tokens = tokenize("sabr");
        assert_eq!(score_card(&c, &tokens, "sabr"), 1.0);
    }

    #[test]
    fn score_is_normalized_per_token() {
        let c = card("Allah is with the patient", Some("patience,sabr"));
        // One token hitting only tags: 3 / 14.
        let tokens = tokenize("sabr");
        let score = score_card(&c, &tokens, "sabr");
        assert!((score - 3.0 / 14.0).abs() < 1e-6, "got {score}");
    }

    #[test]
    fn more_unmatched_tokens_dilute_the_score() {
        let c = card("Allah is with the patient", Some("patience,sabr"));
        let one = score_card(&c, &tokenize("sabr"), "sabr");
        let two = score_card(&c, &tokenize("sabr zzz"), "sabr zzz");
        assert!(two < one);
    }
}
