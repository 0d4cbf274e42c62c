//! Close-match suggestions for unresolvable model names
//!
//! Pure ranking over known names: only genuinely close names are offered,
//! output is deterministic (similarity descending, then lexicographic), and
//! error rendering enumerates a sorted, capped listing so messages are fully
//! testable.

use strsim::normalized_levenshtein;

/// Minimum normalized similarity for a name to be offered as a suggestion
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// Maximum number of suggestions per error
pub const MAX_SUGGESTIONS: usize = 3;

/// Maximum known names enumerated in a not-found message
pub const MAX_LISTED: usize = 10;

/// Rank close matches to `requested` among `known` names.
///
/// Returns at most [`MAX_SUGGESTIONS`] names, best first. Names below the
/// similarity cutoff are never offered; an unmatched request yields an
/// empty list rather than a nearest-path guess.
pub fn suggest(requested: &str, known: &[String]) -> Vec<String> {
    let needle = requested.to_lowercase();

    let mut scored: Vec<(f64, &String)> = known
        .iter()
        .map(|name| (normalized_levenshtein(&needle, &name.to_lowercase()), name))
        .filter(|(score, _)| *score >= SIMILARITY_CUTOFF)
        .collect();

    // Similarity descending, lexicographic tiebreak for determinism
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });

    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.clone())
        .collect()
}

/// Render the message body for a `ModelNotFound` error.
///
/// Lists up to [`MAX_LISTED`] known names in sorted order with a count of the
/// remainder, followed by any close-match suggestions.
pub fn render_not_found(name: &str, available: &[String], suggestions: &[String]) -> String {
    let mut sorted = available.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut msg = format!("Model '{}' not found.\n\nAvailable models:\n", name);
    for known in sorted.iter().take(MAX_LISTED) {
        msg.push_str(&format!("  - {}\n", known));
    }
    if sorted.len() > MAX_LISTED {
        msg.push_str(&format!("  ... and {} more\n", sorted.len() - MAX_LISTED));
    }
    msg.push_str("\nUse --list-models to see every available model.");

    if !suggestions.is_empty() {
        msg.push_str(&format!("\n\nDid you mean: {}?", suggestions.join(", ")));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_close_misspelling_is_top_and_only_suggestion() {
        let known = names(&["htdemucs", "mdx_extra", "hdemucs_mmi"]);
        let result = suggest("htdemux", &known);
        assert_eq!(result, vec!["htdemucs".to_string()]);
    }

    #[test]
    fn test_distant_name_yields_no_suggestions() {
        let known = names(&["abcd", "efgh"]);
        assert!(suggest("zzzz", &known).is_empty());
    }

    #[test]
    fn test_suggestions_capped_at_three() {
        let known = names(&["model1", "model2", "model3", "model4", "model5"]);
        let result = suggest("model0", &known);
        assert_eq!(result.len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        // Equal similarity resolves lexicographically
        let known = names(&["modelb", "modela"]);
        let result = suggest("modelx", &known);
        assert_eq!(result, vec!["modela".to_string(), "modelb".to_string()]);
    }

    #[test]
    fn test_render_lists_sorted_names() {
        let known = names(&["efgh", "abcd"]);
        let msg = render_not_found("zzzz", &known, &[]);
        assert!(msg.contains("Model 'zzzz' not found"));
        let abcd_pos = msg.find("abcd").unwrap();
        let efgh_pos = msg.find("efgh").unwrap();
        assert!(abcd_pos < efgh_pos, "listing should be sorted");
        assert!(!msg.contains("Did you mean"));
    }

    #[test]
    fn test_render_caps_listing_at_ten() {
        let known: Vec<String> = (0..15).map(|i| format!("model{:02}", i)).collect();
        let msg = render_not_found("nothere", &known, &[]);
        assert!(msg.contains("model09"));
        assert!(!msg.contains("model10\n"));
        assert!(msg.contains("... and 5 more"));
    }

    #[test]
    fn test_render_includes_suggestions() {
        let known = names(&["htdemucs"]);
        let suggestions = names(&["htdemucs"]);
        let msg = render_not_found("htdemux", &known, &suggestions);
        assert!(msg.contains("Did you mean: htdemucs?"));
    }
}
