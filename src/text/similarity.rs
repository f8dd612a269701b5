//! String similarity scoring for differently-formatted human names.
//!
//! The ratio is the classic longest-common-substring recursion: find the
//! longest run the two strings share, recurse into the unmatched prefixes
//! and suffixes, and relate the total matched length to the combined input
//! length. It tolerates OCR truncation and infix noise far better than plain
//! edit distance on names like `GEZAHEGN` vs `GEZAHEGNE`.

use super::normalize::{normalize_for_comparison, normalize_name};

/// Default word-level threshold used by [`names_match`].
pub const NAME_MATCH_THRESHOLD: f32 = 0.85;

/// Longest common substring of `a` and `b`: `(start_a, start_b, len)`.
/// First occurrence wins on ties.
fn longest_common_run(a: &[u8], b: &[u8]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut k = 0;
            while i + k < a.len() && j + k < b.len() && a[i + k] == b[j + k] {
                k += 1;
            }
            if k > best.2 {
                best = (i, j, k);
            }
        }
    }
    best
}

/// Total characters matched by recursively pairing common substrings.
fn matched_chars(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (i, j, len) = longest_common_run(a, b);
    if len == 0 {
        return 0;
    }
    len + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + len..], &b[j + len..])
}

/// Symmetric similarity ratio in `[0, 1]` over the comparison normal form.
///
/// Equal inputs score `1.0`; if either side normalizes to empty (and the
/// other does not), the score is `0.0`.
pub fn similarity(a: &str, b: &str) -> f32 {
    let na = normalize_for_comparison(a);
    let nb = normalize_for_comparison(b);

    if na == nb {
        return 1.0;
    }
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }

    let matched = matched_chars(na.as_bytes(), nb.as_bytes());
    (2.0 * matched as f32) / (na.len() + nb.len()) as f32
}

/// Whether two names plausibly refer to the same person.
///
/// Accepts immediately on normalized equality or full containment (airline
/// systems routinely drop middle names). Otherwise splits both names into
/// words and requires that at least `threshold` of the words in the longer
/// name have a counterpart in the other — identical, or with word-level
/// [`similarity`] above `threshold`.
pub fn names_match(a: &str, b: &str, threshold: f32) -> bool {
    let na = normalize_name(a);
    let nb = normalize_name(b);

    if na == nb {
        return true;
    }
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return true;
    }

    let words_a: Vec<&str> = na.split(' ').collect();
    let words_b: Vec<&str> = nb.split(' ').collect();

    // Count from the longer side; on equal length try both directions so the
    // predicate stays symmetric.
    if words_a.len() > words_b.len() {
        word_match_ratio(&words_a, &words_b, threshold) >= threshold
    } else if words_b.len() > words_a.len() {
        word_match_ratio(&words_b, &words_a, threshold) >= threshold
    } else {
        word_match_ratio(&words_a, &words_b, threshold) >= threshold
            || word_match_ratio(&words_b, &words_a, threshold) >= threshold
    }
}

/// Fraction of `longer`'s words with a counterpart in `other`.
fn word_match_ratio(longer: &[&str], other: &[&str], threshold: f32) -> f32 {
    let matches = longer
        .iter()
        .filter(|w| other.iter().any(|o| *w == o || similarity(w, o) > threshold))
        .count();
    matches as f32 / longer.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── similarity ──────────────────────────────────────────────────

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("BEKELE", "BEKELE"), 1.0);
        assert_eq!(similarity("Bekele", "BEKELE"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn empty_vs_nonempty_scores_zero() {
        assert_eq!(similarity("BEKELE", ""), 0.0);
        assert_eq!(similarity("", "BEKELE"), 0.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity("AAAA", "BBBB"), 0.0);
    }

    #[test]
    fn partial_overlap_scores_between() {
        let s = similarity("GEZAHEGN", "GEZAHEGNE");
        assert!(s > 0.9 && s < 1.0, "got {s}");
    }

    #[test]
    fn swapped_halves_score_partial() {
        // Only the longest run pairs up; the swapped half falls outside the
        // prefix/suffix recursion.
        let s = similarity("ABEBETESHOME", "TESHOMEABEBE");
        assert!(s > 0.5 && s < 0.7, "got {s}");
    }

    #[test]
    fn similarity_is_symmetric() {
        for (a, b) in [
            ("BEKELE ABEBE", "ABEBE"),
            ("GEZAHEGN MOGES", "MOGES GEZAHEGNE"),
            ("DOE JOHN", "SMITH JOHN"),
        ] {
            assert_eq!(similarity(a, b), similarity(b, a), "{a} vs {b}");
        }
    }

    // ── names_match ─────────────────────────────────────────────────

    #[test]
    fn exact_names_match() {
        assert!(names_match("BEKELE ABEBE TESHOME", "Bekele Abebe Teshome", NAME_MATCH_THRESHOLD));
    }

    #[test]
    fn airline_slash_convention_matches_passport_order() {
        assert!(names_match(
            "BEKELE ABEBE TESHOME",
            "BEKELE/ABEBE TESHOME",
            NAME_MATCH_THRESHOLD
        ));
    }

    #[test]
    fn contained_name_matches() {
        // Hotel systems often drop one given name.
        assert!(names_match("EJIGU GEZAHEGN MOGES", "GEZAHEGN MOGES", NAME_MATCH_THRESHOLD));
    }

    #[test]
    fn accented_variant_matches() {
        assert!(names_match("KOUAMÉ DÉSIRÉ", "KOUAME DESIRE", NAME_MATCH_THRESHOLD));
    }

    #[test]
    fn different_surname_does_not_match() {
        assert!(!names_match("DOE JOHN", "SMITH JOHN", NAME_MATCH_THRESHOLD));
    }

    #[test]
    fn unrelated_names_do_not_match() {
        assert!(!names_match("BEKELE ABEBE", "KOUASSI YAO", NAME_MATCH_THRESHOLD));
    }

    #[test]
    fn empty_name_never_matches_nonempty() {
        assert!(!names_match("", "BEKELE", NAME_MATCH_THRESHOLD));
        assert!(!names_match("BEKELE", "", NAME_MATCH_THRESHOLD));
    }

    #[test]
    fn names_match_is_symmetric() {
        let pairs = [
            ("BEKELE ABEBE TESHOME", "BEKELE/ABEBE TESHOME"),
            ("EJIGU GEZAHEGN MOGES", "GEZAHEGN MOGES"),
            ("DOE JOHN", "SMITH JOHN"),
            ("ABEBE ABEBE", "ABEBE KEBEDE"),
        ];
        for (a, b) in pairs {
            assert_eq!(
                names_match(a, b, NAME_MATCH_THRESHOLD),
                names_match(b, a, NAME_MATCH_THRESHOLD),
                "{a} vs {b}"
            );
        }
    }
}
