//! Fuzzy token-set similarity.
//!
//! Model-transcribed addresses drift from the reference in predictable ways:
//! extra tokens (`PARIS 08`, `FRANCE`), reordered components, case and
//! punctuation changes, a `Ç` read as `C`. Token-set scoring absorbs all of
//! these: both strings are normalised and tokenised, and the score reflects
//! how much of each token set is shared, regardless of order or repetition.
//!
//! ## Algorithm
//!
//! 1. Normalise: lowercase, every run of non-alphanumeric characters becomes a
//!    single space, trim.
//! 2. Split into token sets `A` and `B`; if either is empty the score is 0.
//! 3. Build three strings from sorted tokens:
//!    `t0 = A∩B`, `t1 = A∩B + (A−B)`, `t2 = A∩B + (B−A)`.
//! 4. Score = max of the pairwise similarity ratios `(t0,t1)`, `(t0,t2)`,
//!    `(t1,t2)`, rounded to 0–100.
//!
//! The pairwise ratio is the indel similarity `2·LCS / (|a| + |b|)` over
//! characters. When one token set contains the other, `t0` equals one of
//! `t1`/`t2` and the score is 100.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static RE_NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// Token-set similarity between `a` and `b`, on a 0–100 scale.
///
/// Case-insensitive and order-insensitive. Returns 0 when either side has no
/// alphanumeric content.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0;
    }

    let common = join(tokens_a.intersection(&tokens_b));
    let only_a = join(tokens_a.difference(&tokens_b));
    let only_b = join(tokens_b.difference(&tokens_a));

    let t1 = concat(&common, &only_a);
    let t2 = concat(&common, &only_b);

    let best = ratio(&common, &t1)
        .max(ratio(&common, &t2))
        .max(ratio(&t1, &t2));
    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Lowercase, collapse punctuation and whitespace runs into single spaces.
pub fn normalise(s: &str) -> String {
    RE_NON_ALNUM
        .replace_all(&s.to_lowercase(), " ")
        .trim()
        .to_string()
}

fn tokenize(s: &str) -> BTreeSet<String> {
    normalise(s)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn join<'a>(tokens: impl Iterator<Item = &'a String>) -> String {
    tokens.map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn concat(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Indel similarity in `[0, 1]`. Two empty strings are identical.
fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(&a, &b) as f64 / total as f64
}

/// Longest common subsequence length, two-row dynamic programme.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
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
