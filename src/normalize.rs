//! Author name normalization.
//!
//! Catalog headings list the same person under several variants (with or
//! without an honorific, with a trailing "etc."). [`normalize`] reduces a
//! heading to a coarse merge key so those variants fold into one author.

/// Tokens removed wherever they appear as whole words.
pub const HONORIFICS: &[&str] = &["baron", "lord", "sir", "count", "duke", "etc"];

/// Normalize a display name into its merge key.
///
/// Honorific tokens are dropped as whole words (case-insensitive), the rest is
/// lower-cased and whitespace is collapsed and trimmed. Never fails; degenerate
/// input maps to the empty string.
///
/// ```
/// use rustgutenberg::normalize::normalize;
///
/// assert_eq!(normalize("Baron Lytton, Edward"), "lytton, edward");
/// ```
pub fn normalize(display_name: &str) -> String {
    let lowered = display_name.to_lowercase();
    let mut kept = String::with_capacity(lowered.len());
    let mut word = String::new();

    for ch in lowered.chars() {
        if is_word_char(ch) {
            word.push(ch);
        } else {
            flush_word(&mut word, &mut kept);
            kept.push(ch);
        }
    }
    flush_word(&mut word, &mut kept);

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn flush_word(word: &mut String, out: &mut String) {
    if !HONORIFICS.contains(&word.as_str()) {
        out.push_str(word);
    }
    word.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_leading_honorific() {
        assert_eq!(
            normalize("Baron Lytton, Edward"),
            normalize("Lytton, Edward")
        );
        assert_eq!(normalize("Lytton, Edward"), "lytton, edward");
    }

    #[test]
    fn test_strips_every_token_case_insensitive() {
        assert_eq!(normalize("SIR Walter Scott"), "walter scott");
        assert_eq!(normalize("Tolstoy, Lev Nikolayevich, Count"), "tolstoy, lev nikolayevich,");
        assert_eq!(normalize("Duke of Wellington"), "of wellington");
        assert_eq!(normalize("Byron, George Gordon Byron, Baron"), "byron, george gordon byron,");
        assert_eq!(normalize("Smith, John, etc."), "smith, john, .");
    }

    #[test]
    fn test_only_whole_words_are_stripped() {
        assert_eq!(normalize("Lordan, Sirius"), "lordan, sirius");
        assert_eq!(normalize("Countess Ducal"), "countess ducal");
        assert_eq!(normalize("sir_walter"), "sir_walter");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  Lytton,   Lord   Edward \t"), "lytton, edward");
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("Sir Lord Baron"), "");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(name in "\\PC{0,40}") {
            let once = normalize(&name);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn honorific_prefix_never_changes_key(
            token in prop::sample::select(HONORIFICS.to_vec()),
            name in "[A-Za-z]{1,12}, [A-Za-z]{1,12}",
        ) {
            let prefixed = format!("{} {}", token.to_uppercase(), name);
            prop_assert_eq!(normalize(&prefixed), normalize(&name));
        }
    }
}
