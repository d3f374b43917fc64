//! Family-name cleanup shared by the override table, catalog lookup and
//! category fallback.

use regex::Regex;
use lazy_static::lazy_static;
use font_core::FontCategory;

/// Trailing words that name a cut, a width or a vendor edition rather than the family.
const SUFFIX_TOKENS: &[&str] = &[
    "pro", "std", "standard", "neue", "lt", "mt", "ps", "com", "web", "variable", "vf",
    "condensed", "cond", "narrow", "compressed", "extended", "expanded", "wide",
    "thin", "hairline", "extralight", "ultralight", "light", "regular", "normal", "book",
    "medium", "semibold", "demibold", "bold", "extrabold", "ultrabold", "black", "heavy",
    "italic", "oblique", "text", "display",
];

const MONOSPACE_KEYWORDS: &[&str] = &[
    "mono", "code", "console", "consolas", "courier", "terminal", "typewriter", "menlo", "fixed",
];

const HANDWRITING_KEYWORDS: &[&str] = &[
    "script", "hand", "brush", "cursive", "calligraph", "marker", "signature",
];

pub struct FontNormalizer;

impl FontNormalizer {
    /// Lower-case, drop apostrophes and collapse hyphen/underscore/whitespace runs
    /// to a single space.
    pub fn normalize_name(&self, name: &str) -> String {
        lazy_static! {
            static ref SEPARATORS: Regex = Regex::new(r"[-_\s]+").unwrap();
        }
        let lower = name.to_lowercase().replace(&['\'', '\u{2019}', '\u{2018}'][..], "");
        SEPARATORS.replace_all(&lower, " ").trim().to_string()
    }

    /// Remove a bundler-generated suffix (hash, numeric id, `__token`) from a
    /// declared family, keeping the original casing of what is left.
    pub fn strip_build_artifact(&self, name: &str) -> String {
        let mut current = name.trim().to_string();
        // suffixes can stack, e.g. `Inter_Fallback_1a2b3c`
        for _ in 0..4 {
            match Self::strip_once(&current) {
                Some(stripped) if !stripped.is_empty() && stripped != current => current = stripped,
                _ => break,
            }
        }
        current
    }

    fn strip_once(name: &str) -> Option<String> {
        lazy_static! {
            static ref NEXT_FONT: Regex =
                Regex::new(r"^__(.+?)(?:_Fallback)?_[0-9a-f]{5,}$").unwrap();
            static ref DOUBLE_UNDERSCORE: Regex = Regex::new(r"^(.+?)__[A-Za-z0-9]+$").unwrap();
            static ref JOINED_HEX_HASH: Regex = Regex::new(r"^(.+?)[-_]([0-9a-fA-F]{6,})$").unwrap();
            static ref SPACED_HEX_HASH: Regex = Regex::new(r"^(.+?)[ .]([0-9a-fA-F]{6,})$").unwrap();
            static ref NUMERIC_ID: Regex = Regex::new(r"^(.+?)[-_](\d{3,})$").unwrap();
        }

        if let Some(caps) = NEXT_FONT.captures(name) {
            return Some(caps[1].to_string());
        }
        if let Some(caps) = DOUBLE_UNDERSCORE.captures(name) {
            return Some(caps[1].to_string());
        }
        if let Some(caps) = JOINED_HEX_HASH.captures(name) {
            return Some(caps[1].to_string());
        }
        if let Some(caps) = SPACED_HEX_HASH.captures(name) {
            // a separate word like "Facade" is hex too; only a digit marks it as a hash
            if caps[2].chars().any(|c| c.is_ascii_digit()) {
                return Some(caps[1].to_string());
            }
        }
        NUMERIC_ID.captures(name).map(|caps| caps[1].to_string())
    }

    /// Drop trailing style/edition words from an already normalized name.
    /// The first word is never removed.
    pub fn strip_suffix_tokens(&self, normalized: &str) -> String {
        self.suffix_variants(normalized)
            .pop()
            .unwrap_or_else(|| normalized.trim().to_string())
    }

    /// Every shortening of `normalized` obtained by removing trailing suffix
    /// tokens one at a time, longest first. Empty when nothing can be removed.
    pub fn suffix_variants(&self, normalized: &str) -> Vec<String> {
        let mut words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
        let mut variants = Vec::new();
        while words.len() > 1 {
            match words.last() {
                Some(last) if SUFFIX_TOKENS.contains(last) => {
                    words.pop();
                    variants.push(words.join(" "));
                }
                _ => break,
            }
        }
        variants
    }

    /// Full lookup key: artifact stripped, then normalized.
    pub fn lookup_key(&self, name: &str) -> String {
        self.normalize_name(&self.strip_build_artifact(name))
    }

    /// Guess a coarse category from keywords in the family name.
    pub fn infer_category(&self, name: &str) -> Option<FontCategory> {
        let lower = self.normalize_name(name);

        if MONOSPACE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Some(FontCategory::Monospace)
        } else if lower.contains("serif") && !lower.contains("sans") {
            Some(FontCategory::Serif)
        } else if lower.contains("sans") {
            Some(FontCategory::SansSerif)
        } else if HANDWRITING_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Some(FontCategory::Handwriting)
        } else {
            None
        }
    }
}

pub fn normalize_name(name: &str) -> String {
    FontNormalizer.normalize_name(name)
}

pub fn strip_build_artifact(name: &str) -> String {
    FontNormalizer.strip_build_artifact(name)
}

pub fn strip_suffix_tokens(normalized: &str) -> String {
    FontNormalizer.strip_suffix_tokens(normalized)
}

pub fn suffix_variants(normalized: &str) -> Vec<String> {
    FontNormalizer.suffix_variants(normalized)
}

pub fn lookup_key(name: &str) -> String {
    FontNormalizer.lookup_key(name)
}

pub fn infer_category(name: &str) -> Option<FontCategory> {
    FontNormalizer.infer_category(name)
}

/// Bidirectional prefix containment: one name starts with the other and the
/// shorter of the two has at least `min_len` characters.
pub fn prefix_related(a: &str, b: &str, min_len: usize) -> bool {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    short.chars().count() >= min_len && long.starts_with(short)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Helvetica-Neue"), "helvetica neue");
        assert_eq!(normalize_name("  HELVETICA   neue "), "helvetica neue");
        assert_eq!(normalize_name("Helvetica_Neue"), "helvetica neue");
        assert_eq!(normalize_name("Avenir Next--LT"), "avenir next lt");
        assert_eq!(normalize_name("D\u{2019}Nealian"), "dnealian");
        assert_eq!(normalize_name("Fira'Code"), "firacode");
    }

    #[test]
    fn test_strip_build_artifact() {
        assert_eq!(strip_build_artifact("Inter_a1b2c3"), "Inter");
        assert_eq!(strip_build_artifact("Inter-5f2e9a1b"), "Inter");
        assert_eq!(strip_build_artifact("__Inter_a64ecd"), "Inter");
        assert_eq!(strip_build_artifact("__Open_Sans_Fallback_3d9f21"), "Open_Sans");
        assert_eq!(strip_build_artifact("Roboto__xyz"), "Roboto");
        assert_eq!(strip_build_artifact("Lato-10234"), "Lato");
        assert_eq!(strip_build_artifact("Source Sans 3"), "Source Sans 3");
        assert_eq!(strip_build_artifact("Old Facade"), "Old Facade");
        assert_eq!(strip_build_artifact("Inter 1a2b3c"), "Inter");
        // letter-only hashes behind a joining separator
        assert_eq!(strip_build_artifact("Inter_abcdef"), "Inter");
        assert_eq!(strip_build_artifact("Inter-deadbeef"), "Inter");
        assert_eq!(strip_build_artifact("Lato_fabcde"), "Lato");
        assert_eq!(strip_build_artifact("Open_Sans_ABCDEF"), "Open_Sans");
        assert_eq!(lookup_key("Inter_abcdef"), "inter");
        assert_eq!(strip_build_artifact("Merriweather"), "Merriweather");
    }

    #[test]
    fn test_strip_suffix_tokens() {
        assert_eq!(strip_suffix_tokens("helvetica neue lt std bold"), "helvetica");
        assert_eq!(strip_suffix_tokens("futura pt"), "futura pt");
        assert_eq!(strip_suffix_tokens("times new roman"), "times new roman");
        assert_eq!(strip_suffix_tokens("bold"), "bold");
        assert_eq!(strip_suffix_tokens("proxima nova condensed"), "proxima nova");
        assert_eq!(
            suffix_variants("helvetica neue bold italic"),
            vec!["helvetica neue bold", "helvetica neue", "helvetica"]
        );
        assert!(suffix_variants("garamond").is_empty());
    }

    #[test]
    fn test_infer_category() {
        assert_eq!(infer_category("JetBrains Mono"), Some(FontCategory::Monospace));
        assert_eq!(infer_category("Source Code Pro"), Some(FontCategory::Monospace));
        assert_eq!(infer_category("PT Serif"), Some(FontCategory::Serif));
        assert_eq!(infer_category("Noto Sans Serif"), Some(FontCategory::SansSerif));
        assert_eq!(infer_category("Open Sans"), Some(FontCategory::SansSerif));
        assert_eq!(infer_category("Brush Script MT"), Some(FontCategory::Handwriting));
        assert_eq!(infer_category("Garamond"), None);
    }

    #[test]
    fn test_prefix_related() {
        assert!(prefix_related("roboto", "roboto flex", 3));
        assert!(prefix_related("roboto flex", "roboto", 3));
        assert!(!prefix_related("ro", "roboto", 3));
        assert!(!prefix_related("lato", "inter", 3));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(name in "[A-Za-z '_\\-]{0,24}") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once.clone());
            prop_assert!(!once.contains("  "));
            prop_assert!(!once.chars().any(|c| c.is_uppercase()));
        }

        #[test]
        fn prop_hash_suffix_resolves_to_base(
            base in "[A-Z][a-z]{2,10}",
            digit in 0u8..10,
            hash in "[0-9a-f]{5,10}",
        ) {
            let name = format!("{}_{}{}", base, digit, hash);
            prop_assert_eq!(strip_build_artifact(&name), base.clone());
            let name = format!("{}__{}", base, hash);
            prop_assert_eq!(strip_build_artifact(&name), base);
        }

        #[test]
        fn prop_joined_hash_suffix_resolves_to_base(
            base in "[A-Z][a-z]{2,10}",
            separator in "[-_]",
            hash in "[a-fA-F]{6,12}|[0-9a-f]{6,12}",
        ) {
            let name = format!("{}{}{}", base, separator, hash);
            prop_assert_eq!(strip_build_artifact(&name), base.clone());
            prop_assert_eq!(lookup_key(&name), base.to_lowercase());
        }
    }
}
