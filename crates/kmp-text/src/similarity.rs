//! Question similarity used to keep follow-up questions from repeating.
//!
//! The score is a character-level matching ratio (`2·LCS / total length`)
//! over cleaned text, boosted by up to 0.3 when both questions mention the
//! same domain keywords.

use once_cell::sync::Lazy;
use regex::Regex;

const STOP_WORDS: &[&str] = &[
    "هل", "ما", "من", "في", "على", "عن", "إلى", "هو", "هي", "أو", "أن", "التي", "الذي",
];

const DOMAIN_KEYWORDS: &[&str] = &[
    "كهرباء", "كهربائي", "حريق", "إصابة", "ضرر", "مسؤول", "صيانة", "إبلاغ", "تصليح", "مشكلة",
    "تماس", "عزل", "تيار", "معدة", "آلة", "جهاز", "موقع", "مكان", "طابق", "دور",
];

const MAX_BONUS: f64 = 0.3;
const BONUS_PER_KEYWORD: f64 = 0.1;

static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[،,\.؟\?!]").unwrap());

fn clean(text: &str) -> String {
    let stripped = PUNCT_RE.replace_all(text, " ").to_lowercase();
    stripped
        .split_whitespace()
        .filter(|token| !STOP_WORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of the longest common subsequence of two char slices.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn matching_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(&a, &b) as f64 / total as f64
}

fn keyword_bonus(a: &str, b: &str) -> f64 {
    let shared = DOMAIN_KEYWORDS
        .iter()
        .filter(|kw| a.contains(*kw) && b.contains(*kw))
        .count();
    (BONUS_PER_KEYWORD * shared as f64).min(MAX_BONUS)
}

/// Boosted similarity score of two questions. Symmetric.
pub fn similarity_score(a: &str, b: &str) -> f64 {
    let a = clean(a);
    let b = clean(b);
    matching_ratio(&a, &b) + keyword_bonus(&a, &b)
}

/// Whether two questions ask essentially the same thing.
pub fn are_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity_score(a, b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmp_core::config::DEFAULT_SIMILARITY_THRESHOLD;
    use proptest::prelude::*;

    #[test]
    fn test_clean_drops_stop_words_and_punctuation() {
        assert_eq!(clean("هل تم تحديد مصدر المشكلة؟"), "تم تحديد مصدر المشكلة");
        assert_eq!(clean("Is it OK?"), "is it ok");
        // Stop words are removed as whole tokens only.
        assert_eq!(clean("هلال"), "هلال");
    }

    #[test]
    fn test_lcs_len() {
        let a: Vec<char> = "abcde".chars().collect();
        let b: Vec<char> = "ace".chars().collect();
        assert_eq!(lcs_len(&a, &b), 3);
        assert_eq!(lcs_len(&a, &[]), 0);
    }

    #[test]
    fn test_both_empty_is_identical() {
        assert!((similarity_score("", "") - 1.0).abs() < 1e-9);
        assert!((similarity_score("هل؟", "ما") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_bonus_pushes_over_threshold() {
        let a = "هل يمكنك تحديد المكان الدقيق للمشكلة الكهربائية وتأثيرها على المرافق الأخرى؟";
        let b = "هل تم تحديد مصدر المشكلة الكهربائية؟";
        let bonus = keyword_bonus(&clean(a), &clean(b));
        assert!((bonus - 0.2).abs() < 1e-9);
        assert!(are_similar(a, b, DEFAULT_SIMILARITY_THRESHOLD));
    }

    #[test]
    fn test_unrelated_questions_differ() {
        let a = "ما هي أبعاد المنتج ووزنه؟";
        let b = "من هو الشخص المسؤول عن متابعة هذا الموضوع؟";
        assert!(!are_similar(a, b, DEFAULT_SIMILARITY_THRESHOLD));
    }

    #[test]
    fn test_bonus_is_capped() {
        let a = "كهرباء حريق إصابة ضرر";
        let b = "كهرباء حريق إصابة ضرر";
        assert!((keyword_bonus(a, b) - MAX_BONUS).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_reflexive(text in "[\\p{Arabic} a-z؟،]{1,40}") {
            prop_assert!(are_similar(&text, &text, DEFAULT_SIMILARITY_THRESHOLD));
        }

        #[test]
        fn prop_symmetric(a in "[\\p{Arabic} a-z؟،]{0,30}", b in "[\\p{Arabic} a-z؟،]{0,30}") {
            prop_assert!((similarity_score(&a, &b) - similarity_score(&b, &a)).abs() < 1e-9);
            prop_assert_eq!(
                are_similar(&a, &b, DEFAULT_SIMILARITY_THRESHOLD),
                are_similar(&b, &a, DEFAULT_SIMILARITY_THRESHOLD)
            );
        }
    }
}
