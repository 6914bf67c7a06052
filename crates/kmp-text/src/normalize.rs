//! Spelling normalization for free-form Arabic input.
//!
//! Two passes, always in the same order:
//! 1. whole-word dictionary corrections (common typos, hamza, taa marbuta,
//!    alef maqsura), applied in a single regex pass;
//! 2. punctuation spacing: one space after Arabic comma/semicolon/question
//!    mark, and after `.` `:` `!` when an Arabic letter follows directly.
//!
//! No correction produces a word that is itself a misspelling in the table,
//! which keeps `normalize` idempotent.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Misspelling → correction.
pub const CORRECTIONS: &[(&str, &str)] = &[
    // similar letters
    ("خسب", "خشب"),
    ("سجرة", "شجرة"),
    ("صندوك", "صندوق"),
    ("طاولط", "طاولة"),
    ("حهاز", "جهاز"),
    ("جهار", "جهاز"),
    // hamza
    ("الى", "إلى"),
    ("انا", "أنا"),
    ("احمد", "أحمد"),
    ("اكثر", "أكثر"),
    ("اقل", "أقل"),
    ("انة", "أنه"),
    ("اخر", "آخر"),
    ("الاخر", "الآخر"),
    ("الان", "الآن"),
    ("الة", "آلة"),
    // taa marbuta
    ("مفاوضه", "مفاوضة"),
    ("شركه", "شركة"),
    ("معلومه", "معلومة"),
    ("بضاعه", "بضاعة"),
    ("سياره", "سيارة"),
    ("شاحنه", "شاحنة"),
    ("عندة", "عنده"),
    // alef maqsura
    ("فى", "في"),
    ("الذى", "الذي"),
    // other frequent typos
    ("منتة", "منتج"),
    ("هنان", "هناك"),
    ("لاكن", "لكن"),
];

static CORRECTION_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| CORRECTIONS.iter().copied().collect());

static WORD_RE: Lazy<Regex> = Lazy::new(|| {
    let mut words: Vec<&str> = CORRECTIONS.iter().map(|(wrong, _)| *wrong).collect();
    // Longest first so the alternation order never depends on table order.
    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{})\b", alternation)).unwrap()
});

// Arabic comma, semicolon and question mark followed by anything but
// whitespace, a digit or more punctuation.
static ARABIC_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([،؛؟])([^\s\d\p{P}])").unwrap());

// Latin sentence punctuation glued to an Arabic letter. Latin letters are
// left alone so URLs, e-mails and times keep their shape.
static LATIN_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.:!])([\p{Arabic}&&\p{L}])").unwrap());

/// Apply only the whole-word correction table.
pub fn correct_words(text: &str) -> String {
    WORD_RE
        .replace_all(text, |caps: &Captures| {
            let wrong = &caps[0];
            CORRECTION_MAP.get(wrong).copied().unwrap_or(wrong).to_string()
        })
        .into_owned()
}

/// Correct common misspellings and fix punctuation spacing.
pub fn normalize(text: &str) -> String {
    let corrected = correct_words(text);
    let spaced = ARABIC_PUNCT_RE.replace_all(&corrected, "${1} ${2}");
    LATIN_PUNCT_RE.replace_all(&spaced, "${1} ${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_corrects_whole_words() {
        assert_eq!(normalize("ذهبت الى الشركه"), "ذهبت إلى الشركه");
        assert_eq!(normalize("هذه شركه كبيرة"), "هذه شركة كبيرة");
        assert_eq!(normalize("فى المكتب"), "في المكتب");
    }

    #[test]
    fn test_leaves_substrings_alone() {
        // "الان" is a correction target, "الانتاج" is not.
        assert_eq!(normalize("الانتاج"), "الانتاج");
        assert_eq!(normalize("الان"), "الآن");
    }

    #[test]
    fn test_punctuation_spacing() {
        assert_eq!(normalize("نعم،ولكن"), "نعم، ولكن");
        assert_eq!(normalize("هل انتهى؟وماذا بعد"), "هل انتهى؟ وماذا بعد");
        assert_eq!(normalize("انتهى.ثم بدأ"), "انتهى. ثم بدأ");
    }

    #[test]
    fn test_punctuation_keeps_numbers_and_urls() {
        assert_eq!(normalize("الجهد 3.5 فولت"), "الجهد 3.5 فولت");
        assert_eq!(normalize("الساعة 10:30"), "الساعة 10:30");
        assert_eq!(normalize("راجع example.com"), "راجع example.com");
        assert_eq!(normalize("١،٢"), "١،٢");
    }

    #[test]
    fn test_no_output_is_a_misspelling() {
        for (_, right) in CORRECTIONS {
            assert!(
                !CORRECTION_MAP.contains_key(right),
                "{} is both a correction and a misspelling",
                right
            );
        }
    }

    fn token() -> impl Strategy<Value = String> {
        let mut words: Vec<String> = CORRECTIONS
            .iter()
            .flat_map(|(w, r)| [w.to_string(), r.to_string()])
            .collect();
        words.extend(
            ["،", "؛", "؟", ".", ":", "!", " ", "  ", "3", "٣", "abc", "ـ", "مرحبا", "\n"]
                .iter()
                .map(|s| s.to_string()),
        );
        proptest::sample::select(words)
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent_on_table_words(tokens in proptest::collection::vec(token(), 0..24)) {
            let text: String = tokens.concat();
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalize_idempotent_on_any_text(text in "\\PC{0,64}") {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
