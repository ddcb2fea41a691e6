// crates/epe-core/src/tokenizer.rs
//
// Splits raw witness text into an ordered token sequence.
//
// A token is the matched substring of every non-overlapping match of the
// active pattern, left to right. Nothing else (no normalization, no
// segmentation) is applied.

use regex::{Regex, RegexBuilder};

use crate::error::EditionError;

/// Source of the default pattern: a maximal run of non-whitespace characters.
pub const DEFAULT_PATTERN: &str = r"\S+";

/// A compiled tokenization pattern.
///
/// Accepts either a bare pattern (`\w+`) or a delimited pattern with flags
/// (`/\w+/i`). Matching is always global; the `g` flag is accepted and implied.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The pattern exactly as the user supplied it (after trimming).
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Parse and compile a user-supplied pattern.
    ///
    /// A blank input selects the default pattern. On failure the caller keeps
    /// whatever pattern it had before; nothing is half-updated here.
    pub fn parse(input: &str) -> Result<Self, EditionError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::default());
        }

        let regex = match split_delimited(input) {
            Some((body, flags)) => compile_with_flags(body, flags)?,
            None => RegexBuilder::new(input)
                .build()
                .map_err(|e| EditionError::InvalidPattern(e.to_string()))?,
        };

        Ok(Self {
            source: input.to_string(),
            regex,
        })
    }

    /// The pattern as supplied by the user.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this is the built-in whitespace-splitting pattern.
    pub fn is_default(&self) -> bool {
        self.source == DEFAULT_PATTERN
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_PATTERN.to_string(),
            // The default pattern is a literal known to compile.
            regex: Regex::new(DEFAULT_PATTERN).expect("default pattern compiles"),
        }
    }
}

/// `/body/flags` → `(body, flags)`. Only when a closing slash follows the opening one.
fn split_delimited(input: &str) -> Option<(&str, &str)> {
    if !input.starts_with('/') {
        return None;
    }
    let last = input.rfind('/')?;
    if last == 0 {
        return None;
    }
    Some((&input[1..last], &input[last + 1..]))
}

fn compile_with_flags(body: &str, flags: &str) -> Result<Regex, EditionError> {
    let mut builder = RegexBuilder::new(body);
    let mut seen = String::new();

    for flag in flags.chars() {
        if seen.contains(flag) {
            return Err(EditionError::InvalidPattern(format!(
                "duplicate flag '{}' in /{}/{}",
                flag, body, flags
            )));
        }
        seen.push(flag);

        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'u' | 'v' => {
                if seen.contains(if flag == 'u' { 'v' } else { 'u' }) {
                    return Err(EditionError::InvalidPattern(format!(
                        "flags 'u' and 'v' are exclusive in /{}/{}",
                        body, flags
                    )));
                }
                builder.unicode(true);
            }
            // Global matching is always on; match indices carry no meaning here.
            'g' | 'd' => {}
            other => {
                return Err(EditionError::InvalidPattern(format!(
                    "unsupported flag '{}' in /{}/{}",
                    other, body, flags
                )));
            }
        }
    }

    builder
        .build()
        .map_err(|e| EditionError::InvalidPattern(e.to_string()))
}

/// Tokenize `text` with `pattern`.
///
/// Empty text yields an empty sequence. Zero-width matches produce empty tokens.
pub fn tokenize(text: &str, pattern: &Pattern) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    pattern
        .regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_splits_on_any_whitespace() {
        let tokens = tokenize("a  b\tc", &Pattern::default());
        assert_eq!(tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        assert!(tokenize("", &Pattern::default()).is_empty());
        assert!(tokenize("   \n", &Pattern::default()).is_empty());
    }

    #[test]
    fn bare_pattern_matches_globally() {
        let pattern = Pattern::parse(r"\w+").unwrap();
        assert_eq!(tokenize("qala, wa-qila.", &pattern), vec!["qala", "wa", "qila"]);
    }

    #[test]
    fn delimited_pattern_applies_flags() {
        let pattern = Pattern::parse("/ab/gi").unwrap();
        assert_eq!(tokenize("AB ab aB", &pattern), vec!["AB", "ab", "aB"]);
        assert_eq!(pattern.source(), "/ab/gi");
    }

    #[test]
    fn delimited_pattern_without_g_is_still_global() {
        let pattern = Pattern::parse(r"/\d/").unwrap();
        assert_eq!(tokenize("1 2 3", &pattern), vec!["1", "2", "3"]);
    }

    #[test]
    fn blank_input_selects_default() {
        let pattern = Pattern::parse("   ").unwrap();
        assert!(pattern.is_default());
    }

    #[test]
    fn lone_slash_is_a_bare_pattern() {
        let pattern = Pattern::parse("/").unwrap();
        assert_eq!(tokenize("a/b", &pattern), vec!["/"]);
    }

    #[test]
    fn uncompilable_pattern_is_rejected() {
        let err = Pattern::parse("([a-z]").unwrap_err();
        assert!(matches!(err, EditionError::InvalidPattern(_)));
    }

    #[test]
    fn unsupported_flag_is_rejected() {
        let err = Pattern::parse("/a/y").unwrap_err();
        assert!(matches!(err, EditionError::InvalidPattern(msg) if msg.contains("'y'")));
    }

    #[test]
    fn verbose_flag_is_not_a_pattern_flag() {
        assert!(Pattern::parse(r"/a b/x").is_err());
        assert!(Pattern::parse(r"/\w+/v").is_ok());
        assert!(Pattern::parse(r"/\w+/uv").is_err());
    }

    #[test]
    fn duplicate_flag_is_rejected() {
        assert!(Pattern::parse("/a/ii").is_err());
    }

    #[test]
    fn zero_width_matches_are_kept() {
        let pattern = Pattern::parse("x*").unwrap();
        let tokens = tokenize("ab", &pattern);
        assert_eq!(tokens, vec!["", "", ""]);
    }
}
