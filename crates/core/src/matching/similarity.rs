//! String similarity, duration closeness and album equivalence.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use super::normalize::{clean_text, normalize_title};

/// Tokens that carry no identity ("feat", "the", ...).
static FILLER_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "feat", "ft", "featuring", "with", "prod", "produced", "by", "the", "a", "an",
    ]
    .into_iter()
    .collect()
});

/// Weight of an exact token match relative to partial ones.
const EXACT_TOKEN_WEIGHT: f64 = 1.5;
/// Score of a substring match between two tokens.
const SUBSTRING_TOKEN_SCORE: f64 = 0.8;
/// Minimum token length for substring matching.
const SUBSTRING_MIN_LEN: usize = 3;
/// Edit-distance similarity has to beat this to count at all.
const FUZZY_TOKEN_THRESHOLD: f64 = 0.7;
/// Minimum length for album comparisons.
const ALBUM_MIN_LEN: usize = 4;
/// Stripped titles must be longer than this to be compared.
const STRIPPED_TITLE_MIN_LEN: usize = 3;
/// Similarity at which two titles are considered the same.
const EQUIVALENT_TITLE_SIMILARITY: f64 = 0.9;

/// Tokenize for similarity: folded, no single letters, no filler words.
pub fn significant_tokens(s: &str) -> Vec<String> {
    clean_text(s)
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !FILLER_WORDS.contains(*t))
        .map(str::to_string)
        .collect()
}

/// Token-overlap similarity of `b` against `a`, in `[0, 1]`.
///
/// `a` anchors the comparison: every token of `a` looks for its best
/// counterpart in `b`. Callers pass the query as `a` and the candidate
/// as `b`, so the result is only approximately symmetric.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_tokens = significant_tokens(a);
    let b_tokens = significant_tokens(b);
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = a_tokens
        .iter()
        .map(|token| best_token_score(token, &b_tokens))
        .sum();

    (total / (a_tokens.len() as f64 * EXACT_TOKEN_WEIGHT)).min(1.0)
}

/// Weighted score of the best counterpart of `token` among `candidates`.
fn best_token_score(token: &str, candidates: &[String]) -> f64 {
    let mut best = 0.0f64;

    for other in candidates {
        if token == other {
            return EXACT_TOKEN_WEIGHT;
        }

        let token_len = token.chars().count();
        let other_len = other.chars().count();
        let score = if token_len >= SUBSTRING_MIN_LEN
            && other_len >= SUBSTRING_MIN_LEN
            && (token.contains(other.as_str()) || other.contains(token))
        {
            SUBSTRING_TOKEN_SCORE
        } else {
            let max_len = token_len.max(other_len) as f64;
            let sim = 1.0 - levenshtein(token, other) as f64 / max_len;
            if sim > FUZZY_TOKEN_THRESHOLD {
                sim
            } else {
                0.0
            }
        };

        best = best.max(score);
    }

    best
}

/// Levenshtein edit distance over chars (unit costs).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(a_len + 1) {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate().take(b_len + 1) {
        *val = j;
    }

    for (i, a_char) in a_chars.iter().enumerate() {
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if *a_char == *b_char { 0 } else { 1 };
            matrix[i + 1][j + 1] = (matrix[i][j + 1] + 1)
                .min(matrix[i + 1][j] + 1)
                .min(matrix[i][j] + cost);
        }
    }

    matrix[a_len][b_len]
}

/// Closeness of two durations, banded.
///
/// The difference is relative to the query duration. A missing (or zero)
/// duration on either side is not evidence against the match.
pub fn duration_score(query_ms: Option<u64>, candidate_ms: Option<u64>) -> f64 {
    let (query, candidate) = match (query_ms, candidate_ms) {
        (Some(q), Some(c)) if q > 0 && c > 0 => (q, c),
        _ => return 1.0,
    };

    let diff = query.abs_diff(candidate) as f64 / query as f64;
    if diff < 0.05 {
        1.0
    } else if diff <= 0.10 {
        0.9
    } else if diff <= 0.15 {
        0.8
    } else if diff <= 0.25 {
        0.7
    } else {
        0.6
    }
}

/// Whether two album titles name the same release.
///
/// Case-folded equality, containment, or the same base title before a
/// dash or parenthesis ("Abbey Road (Remastered)" vs "Abbey Road - 2019 Mix").
pub fn is_album_match(a1: &str, a2: &str) -> bool {
    let a = a1.trim().to_lowercase();
    let b = a2.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    if shorter.chars().count() >= ALBUM_MIN_LEN && longer.contains(shorter.as_str()) {
        return true;
    }

    let base_a = album_base(&a);
    let base_b = album_base(&b);
    base_a.chars().count() >= ALBUM_MIN_LEN && base_a == base_b
}

/// Album title up to the first dash or opening parenthesis.
fn album_base(album: &str) -> &str {
    album
        .split(['-', '(', '['])
        .next()
        .unwrap_or(album)
        .trim()
}

/// Whether two titles name the same song.
pub fn are_equivalent_titles(t1: &str, t2: &str) -> bool {
    let n1 = normalize_title(t1).to_lowercase();
    let n2 = normalize_title(t2).to_lowercase();
    if n1 == n2 {
        return true;
    }

    let s1 = word_chars(&n1);
    let s2 = word_chars(&n2);
    if s1.chars().count() > STRIPPED_TITLE_MIN_LEN && s1 == s2 {
        return true;
    }

    similarity(&n1, &n2) >= EQUIVALENT_TITLE_SIMILARITY
}

/// Only alphanumeric characters, accents folded.
fn word_chars(s: &str) -> String {
    clean_text(s).chars().filter(|c| c.is_alphanumeric()).collect()
}
