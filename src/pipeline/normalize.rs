//! Ship-name normalisation: raw event text → canonical uppercase ship name.
//!
//! The certification sheet decorates the vessel column with artefacts that
//! must not reach the PG-13:
//!
//! - a Wingdings checkbox that decodes as `þ`
//! - ship-category annotations such as `(ASW C-1)` or `(ASW T-1)`
//! - watch start/end times (`0000`, `0800`, `2359`) that wrap into the cell
//! - asterisks flagging amended rows
//!
//! Each rule is a small pure pass; [`clean_ship_name`] runs them in order.
//! Parentheses go before times so a time inside an annotation disappears with
//! it, and whitespace collapses last so every removal leaves single spaces.

use once_cell::sync::Lazy;
use regex::Regex;

/// Glyph the checkbox column decodes to in Windows-1252.
pub const CHECKMARK_GLYPH: char = 'þ';

/// Normalise raw event text into a ship name.
///
/// Rules (applied in order):
/// 1. Replace the checkmark glyph with a space
/// 2. Remove parenthesised annotations (non-greedy)
/// 3. Remove standalone 3–4 digit tokens (clock times)
/// 4. Replace asterisks with a space
/// 5. Collapse whitespace, trim, upper-case
///
/// The result may be empty; callers drop such events.
pub fn clean_ship_name(raw: &str) -> String {
    let s = replace_checkmarks(raw);
    let s = remove_annotations(&s);
    let s = remove_clock_times(&s);
    let s = remove_asterisks(&s);
    collapse_and_upcase(&s)
}

// ── Rule 1: Checkmark glyph ──────────────────────────────────────────────────

fn replace_checkmarks(input: &str) -> String {
    input.replace(CHECKMARK_GLYPH, " ")
}

// ── Rule 2: Parenthesised annotations ────────────────────────────────────────

static RE_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").unwrap());

fn remove_annotations(input: &str) -> String {
    RE_ANNOTATION.replace_all(input, " ").into_owned()
}

// ── Rule 3: Clock times ──────────────────────────────────────────────────────

static RE_CLOCK_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3,4}\b").unwrap());

fn remove_clock_times(input: &str) -> String {
    RE_CLOCK_TIME.replace_all(input, " ").into_owned()
}

// ── Rule 4: Asterisks ────────────────────────────────────────────────────────

fn remove_asterisks(input: &str) -> String {
    input.replace('*', " ")
}

// ── Rule 5: Whitespace and case ──────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_and_upcase(input: &str) -> String {
    RE_WHITESPACE
        .replace_all(input, " ")
        .trim()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pipeline() {
        assert_eq!(clean_ship_name("  (ASW C-1) 0000 USS*COLE  "), "USS COLE");
    }

    #[test]
    fn test_checkmark_replaced() {
        assert_eq!(replace_checkmarks("þUSS COLE"), " USS COLE");
        assert_eq!(clean_ship_name("þ paul hamilton"), "PAUL HAMILTON");
    }

    #[test]
    fn test_annotations_non_greedy() {
        assert_eq!(
            remove_annotations("(ASW C-1) LAKE ERIE (ASW T-1)"),
            "  LAKE ERIE  "
        );
    }

    #[test]
    fn test_clock_times_only_standalone() {
        assert_eq!(remove_clock_times("0800 DDG 67 2359"), "  DDG 67  ");
        assert_eq!(remove_clock_times("CG70"), "CG70");
        assert_eq!(remove_clock_times("12345"), "12345");
    }

    #[test]
    fn test_asterisks() {
        assert_eq!(remove_asterisks("*USS*COLE*"), " USS COLE ");
    }

    #[test]
    fn test_collapse_and_upcase() {
        assert_eq!(collapse_and_upcase("  lake \t\n erie "), "LAKE ERIE");
    }

    #[test]
    fn test_noise_only_is_empty() {
        assert_eq!(clean_ship_name("(ASW C-1) 0000 2359 * þ"), "");
        assert_eq!(clean_ship_name(""), "");
    }

    #[test]
    fn test_idempotent() {
        let once = clean_ship_name("þ (ASW C-1) uss  paul   hamilton 0800*");
        assert_eq!(clean_ship_name(&once), once);
    }
}
