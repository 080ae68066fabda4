//! Token-set similarity on a 0–100 scale.
//!
//! Insensitive to token order, duplicated tokens, case and punctuation, which
//! is what vision output typically gets wrong. Scores follow the classic
//! `token_set_ratio`: both strings are normalised, split into token sets, and
//! the best indel ratio among (intersection, intersection + rest-of-a,
//! intersection + rest-of-b) wins.

use std::collections::BTreeSet;

/// Lowercase, replace every non-word character with a space, trim.
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    replaced.to_lowercase().trim().to_string()
}

/// Indel similarity `2 * LCS / (len(a) + len(b))`, scaled to 0–100 and
/// rounded half-to-even. Either side empty scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let total = (a.len() + b.len()) as u64;
    let common = lcs_len(&a, &b) as u64;
    round_half_even(200 * common, total) as u8
}

/// Token-set similarity of two raw strings.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |set: BTreeSet<&str>| set.into_iter().collect::<Vec<_>>().join(" ");
    let intersection = join(tokens_a.intersection(&tokens_b).copied().collect());
    let only_a = join(tokens_a.difference(&tokens_b).copied().collect());
    let only_b = join(tokens_b.difference(&tokens_a).copied().collect());

    let combined_a = format!("{intersection} {only_a}").trim().to_string();
    let combined_b = format!("{intersection} {only_b}").trim().to_string();

    ratio(&intersection, &combined_a)
        .max(ratio(&intersection, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn round_half_even(numerator: u64, denominator: u64) -> u64 {
    let quotient = numerator / denominator;
    let twice_remainder = 2 * (numerator % denominator);
    if twice_remainder > denominator || (twice_remainder == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  LEVI, Dana. "), "levi  dana");
        assert_eq!(normalize("שם: דנה לוי"), "שם  דנה לוי");
        assert_eq!(normalize("--"), "");
    }

    #[test]
    fn ratio_basics() {
        assert_eq!(ratio("abc", "abc"), 100);
        assert_eq!(ratio("abc", ""), 0);
        assert_eq!(ratio("abc", "xyz"), 0);
        // 2 * 3 / 8
        assert_eq!(ratio("abc", "abcxy"), 75);
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(round_half_even(145, 2), 72); // 72.5
        assert_eq!(round_half_even(147, 2), 74); // 73.5
        assert_eq!(round_half_even(149, 2), 74); // 74.5
        assert_eq!(round_half_even(151, 2), 76); // 75.5
        assert_eq!(round_half_even(2000, 27), 74); // 74.07
    }

    #[test]
    fn token_order_and_duplicates_do_not_matter() {
        assert_eq!(token_set_ratio("Dana Levi", "Levi Dana"), 100);
        assert_eq!(token_set_ratio("Dana Dana Levi", "levi dana"), 100);
        assert_eq!(token_set_ratio("דנה לוי", "לוי דנה"), 100);
    }

    #[test]
    fn subset_of_tokens_scores_full() {
        // Intersection equals one side's tokens.
        assert_eq!(token_set_ratio("Dana Levi", "Dana Levi Cohen"), 100);
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(token_set_ratio("Dana Levi", "Moshe Peretz") < 50);
    }

    #[test]
    fn empty_or_punctuation_only_scores_zero() {
        assert_eq!(token_set_ratio("", "Dana"), 0);
        assert_eq!(token_set_ratio("...", "Dana"), 0);
    }
}
