//! Review text normalisation shared by labeling, training and serving.

use once_cell::sync::Lazy;
use regex::Regex;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s]").expect("valid regex"));

/// Clean review text for rule matching and encoding.
///
/// URLs are removed, every character other than an ASCII letter, digit or
/// whitespace becomes a space, the result is lower-cased and whitespace runs
/// collapse to a single space. The function is idempotent.
pub fn normalize(text: &str) -> String {
    let without_urls = URL.replace_all(text, " ");
    let alnum = NON_ALNUM.replace_all(&without_urls, " ");
    alnum
        .split_whitespace()
        .map(|token| token.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_urls_and_punctuation() {
        let cleaned = normalize("Great!! See https://example.com/x?y=1 for MORE info.");
        assert_eq!(cleaned, "great see for more info");
    }

    #[test]
    fn apostrophes_split_words() {
        assert_eq!(normalize("Didn't work"), "didn t work");
    }

    #[test]
    fn non_ascii_letters_are_removed() {
        assert_eq!(normalize("Café — très bien"), "caf tr s bien");
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  \t\n "), "");
        assert_eq!(normalize("!!!"), "");
    }
}
