//! Text normalization for track titles and artist credits.
//!
//! Title normalization is an ordered pipeline of small named transforms.
//! Each transform is a pure `&str -> String` function so it can be tested
//! (and reordered) on its own. A later step can expose text an earlier
//! one would still rewrite (dropping `(Live)` from `Song -(Live)` leaves a
//! dangling dash), so [`normalize_title`] reruns [`TITLE_PIPELINE`] until
//! the output stops changing.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// A named step of a normalization pipeline.
#[derive(Clone, Copy)]
pub struct Transform {
    /// Step name, used in debug output.
    pub name: &'static str,
    /// The transform itself.
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform").field("name", &self.name).finish()
    }
}

/// Steps applied by [`normalize_title`], in order.
pub const TITLE_PIPELINE: &[Transform] = &[
    Transform { name: "nfc", apply: nfc },
    Transform { name: "strip_featuring", apply: strip_featuring },
    Transform { name: "drop_dash_suffix", apply: drop_dash_suffix },
    Transform { name: "drop_trailing_brackets", apply: drop_trailing_brackets },
    Transform { name: "collapse_acronyms", apply: collapse_acronyms },
    Transform { name: "collapse_whitespace", apply: collapse_whitespace },
];

/// Steps applied by [`normalize_artist`], in order.
pub const ARTIST_PIPELINE: &[Transform] = &[
    Transform { name: "nfc", apply: nfc },
    Transform { name: "collapse_whitespace", apply: collapse_whitespace },
];

/// `(feat. X)`, `[ft. X]`, `(featuring X)` anywhere in the string.
static FEAT_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\(\[]\s*(?:featuring\s|feat\.\s*|feat\s|ft\.\s*|ft\s)[^\)\]]*[\)\]]")
        .unwrap()
});

/// Bare `feat. X` / `ft. X` running to the end of the string.
static FEAT_TRAILING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:featuring\s|feat\.\s*|feat\s|ft\.\s*|ft\s).*$").unwrap()
});

/// Run a pipeline over the input.
pub fn run_pipeline(pipeline: &[Transform], input: &str) -> String {
    pipeline
        .iter()
        .fold(input.to_string(), |acc, step| (step.apply)(&acc))
}

/// Canonical form of a track title, used for matching and queries.
///
/// Idempotent: `normalize_title(&normalize_title(s)) == normalize_title(s)`.
pub fn normalize_title(s: &str) -> String {
    let original = collapse_whitespace(&nfc(s));
    let mut current = original.clone();

    // Every step only removes text, so this terminates.
    loop {
        let next = run_pipeline(TITLE_PIPELINE, &current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        // Everything was a suffix, e.g. "(feat. X)". Keep the text rather
        // than matching against nothing.
        return original;
    }
    current
}

/// Canonical form of an artist credit: NFC and whitespace only.
///
/// Case and diacritics are kept; the fuzzy comparisons fold them later.
pub fn normalize_artist(s: &str) -> String {
    run_pipeline(ARTIST_PIPELINE, s)
}

/// Aggressive fold for fuzzy comparison only, never for display.
///
/// Strips diacritics, drops apostrophes, turns other punctuation into
/// spaces, lowercases and collapses whitespace.
pub fn clean_text(s: &str) -> String {
    let folded: String = s
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&folded.to_lowercase())
}

/// Remove diacritics but keep everything else (case, punctuation).
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Unicode NFC composition.
pub fn nfc(s: &str) -> String {
    s.nfc().collect()
}

/// Trim and replace every whitespace run with a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove featured-artist credits in any case and position.
pub fn strip_featuring(s: &str) -> String {
    let without_groups = FEAT_GROUP.replace_all(s, "");
    FEAT_TRAILING.replace(&without_groups, "").into_owned()
}

/// Cut everything after the first standalone dash outside brackets.
///
/// "Song - Remastered 2011" becomes "Song". A dash glued to a word
/// ("Jay-Z") or inside brackets is left alone, and so is a leading dash.
pub fn drop_dash_suffix(s: &str) -> String {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let mut depth = 0usize;

    for (pos, &(byte_idx, c)) in chars.iter().enumerate() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '-' | '\u{2013}' | '\u{2014}' if depth == 0 => {
                let prev_is_space = pos > 0 && chars[pos - 1].1.is_whitespace();
                let next_is_space = chars
                    .get(pos + 1)
                    .map(|(_, next)| next.is_whitespace())
                    .unwrap_or(true);
                let prefix = s[..byte_idx].trim_end();
                if prev_is_space && next_is_space && !prefix.is_empty() {
                    return prefix.to_string();
                }
            }
            _ => {}
        }
    }

    s.to_string()
}

/// Repeatedly drop a trailing `(...)` or `[...]` group.
///
/// A group that makes up the whole title is kept.
pub fn drop_trailing_brackets(s: &str) -> String {
    let mut current = s.trim_end().to_string();

    loop {
        let Some(open_idx) = trailing_group_start(&current) else {
            break;
        };
        let prefix = current[..open_idx].trim_end();
        if prefix.is_empty() {
            break;
        }
        current = prefix.to_string();
    }

    current
}

/// Byte index of the bracket opening the group that ends the string.
fn trailing_group_start(s: &str) -> Option<usize> {
    let last = s.chars().last()?;
    if last != ')' && last != ']' {
        return None;
    }

    let mut depth = 0usize;
    for (idx, c) in s.char_indices().rev() {
        match c {
            ')' | ']' => depth += 1,
            '(' | '[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Collapse dotted acronyms: "S.A.D." becomes "SAD".
pub fn collapse_acronyms(s: &str) -> String {
    s.split_whitespace()
        .map(collapse_acronym_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_acronym_token(token: &str) -> String {
    // Allow surrounding punctuation such as quotes: "S.A.D."
    let core_start = token
        .find(|c: char| c.is_alphanumeric())
        .unwrap_or(token.len());
    let core_end = token
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphanumeric() || *c == '.')
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(core_start);
    if core_start >= core_end {
        return token.to_string();
    }

    let core = &token[core_start..core_end];
    if is_dotted_acronym(core) {
        let collapsed: String = core.chars().filter(|c| *c != '.').collect();
        format!("{}{}{}", &token[..core_start], collapsed, &token[core_end..])
    } else {
        token.to_string()
    }
}

/// Letter, dot, letter, dot... with at least two letters.
fn is_dotted_acronym(core: &str) -> bool {
    let chars: Vec<char> = core.chars().collect();
    let mut letters = 0;
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_alphabetic() {
            return false;
        }
        letters += 1;
        match chars.get(i + 1) {
            Some('.') => i += 2,
            None => break,
            Some(_) => return false,
        }
    }

    letters >= 2 && core.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_featuring_group() {
        assert_eq!(strip_featuring("Red Nosed (feat. X)"), "Red Nosed");
        assert_eq!(strip_featuring("Song [FT. Someone] (Live)"), "Song (Live)");
        assert_eq!(strip_featuring("Song (Featuring A & B)"), "Song");
    }

    #[test]
    fn test_strip_featuring_trailing() {
        assert_eq!(strip_featuring("Song feat. Other Artist"), "Song");
        assert_eq!(strip_featuring("Song Ft. Other"), "Song");
        assert_eq!(strip_featuring("Lift Off"), "Lift Off");
        assert_eq!(strip_featuring("Feather (Remix)"), "Feather (Remix)");
    }

    #[test]
    fn test_drop_dash_suffix() {
        assert_eq!(drop_dash_suffix("Song - Remastered 2011"), "Song");
        assert_eq!(drop_dash_suffix("Song – Radio Edit"), "Song");
        assert_eq!(drop_dash_suffix("Jay-Z Anthem"), "Jay-Z Anthem");
        assert_eq!(drop_dash_suffix("Song (A - B)"), "Song (A - B)");
        assert_eq!(drop_dash_suffix("- Intro"), "- Intro");
    }

    #[test]
    fn test_drop_trailing_brackets() {
        assert_eq!(drop_trailing_brackets("Song (Live) [Remastered]"), "Song");
        assert_eq!(drop_trailing_brackets("Song (Part (2))"), "Song");
        assert_eq!(drop_trailing_brackets("(Intro)"), "(Intro)");
        assert_eq!(drop_trailing_brackets("Song (Live) Version"), "Song (Live) Version");
    }

    #[test]
    fn test_collapse_acronyms() {
        assert_eq!(collapse_acronyms("S.A.D."), "SAD");
        assert_eq!(collapse_acronyms("Welcome to the U.S.A"), "Welcome to the USA");
        assert_eq!(collapse_acronyms("\"S.A.D.\" Song"), "\"SAD\" Song");
        assert_eq!(collapse_acronyms("Mr. Brightside"), "Mr. Brightside");
        assert_eq!(collapse_acronyms("Version 2.0"), "Version 2.0");
    }

    #[test]
    fn test_collapse_acronyms_multibyte() {
        assert_eq!(collapse_acronyms("Déjà Vu"), "Déjà Vu");
        assert_eq!(collapse_acronyms("Café"), "Café");
        assert_eq!(collapse_acronyms("東京"), "東京");
        assert_eq!(collapse_acronyms("É.T."), "ÉT");
        assert_eq!(collapse_acronyms("«Beyoncé»"), "«Beyoncé»");
    }

    #[test]
    fn test_normalize_title_non_ascii() {
        assert_eq!(normalize_title("Déjà Vu"), "Déjà Vu");
        assert_eq!(normalize_title("Beyoncé"), "Beyoncé");
        assert_eq!(normalize_title("東京 (Live)"), "東京");
        assert_eq!(normalize_title("  Café   del   Mar  [2004 Remaster] "), "Café del Mar");
    }

    #[test]
    fn test_normalize_title_reruns_until_stable() {
        // Bracket removal exposes a dash
        assert_eq!(normalize_title("Song -(Live)"), "Song");
        // Acronym collapsing produces a bare featuring marker
        assert_eq!(normalize_title("Song F.T. Someone"), "Song");
    }

    #[test]
    fn test_normalize_title_full() {
        assert_eq!(normalize_title("Red Nosed (feat. X)"), "Red Nosed");
        assert_eq!(
            normalize_title("  S.A.D.  -  2015 Remaster (Deluxe) "),
            "SAD"
        );
        assert_eq!(normalize_title("Song ft. A - Remix"), "Song");
    }

    #[test]
    fn test_normalize_title_keeps_suffix_only_titles() {
        assert_eq!(normalize_title("(feat. X)"), "(feat. X)");
        assert_eq!(normalize_title("(Intro)"), "(Intro)");
    }

    #[test]
    fn test_normalize_title_is_idempotent() {
        let samples = [
            "Red Nosed (feat. X)",
            "S.A.D.(Live)",
            "Song (Live) - Remix (feat X)",
            "Song (A - B)",
            "A ( B - C",
            "(feat. X)",
            "  Café   del   Mar  [2004 Remaster] ",
            "Don't Stop Me Now - Remastered 2011",
            "Song ft.(X)",
            "U.S.A. - Live",
            "Hello — World",
            "Song -(Live)",
            "Song F.T. Someone",
            "Déjà Vu",
            "Beyoncé",
            "東京",
            "東京 - ライブ",
            "",
        ];
        for sample in samples {
            let once = normalize_title(sample);
            let twice = normalize_title(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_normalize_artist_keeps_case_and_accents() {
        assert_eq!(normalize_artist("  Beyoncé   Knowles "), "Beyoncé Knowles");
        // Decomposed e + combining acute becomes the precomposed form.
        assert_eq!(normalize_artist("Beyonce\u{301}"), "Beyonc\u{e9}");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("Beyoncé - Halo!"), "beyonce halo");
        assert_eq!(clean_text("Don't Stop"), "dont stop");
        assert_eq!(clean_text("Rock&Roll"), "rock roll");
    }

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("Sigur Rós"), "Sigur Ros");
        assert_eq!(strip_accents("Motörhead"), "Motorhead");
    }

    #[test]
    fn test_pipeline_names() {
        let names: Vec<&str> = TITLE_PIPELINE.iter().map(|t| t.name).collect();
        assert_eq!(names.first(), Some(&"nfc"));
        assert_eq!(names.last(), Some(&"collapse_whitespace"));
    }
}
