//! Canonicalization of locale and alias strings.
//!
//! Canonical codes are the keys used to name model directories and route
//! translations: mostly ISO 639-1 codes, plus `zh-hant` for Traditional
//! Chinese, which ships as separate models.

/// Known regional and alias spellings, keyed by their lowercased,
/// hyphen-separated form.
///
/// Every value must also map to itself (directly or by being absent from the
/// keys and hyphen-free) so that normalization is idempotent.
const ALIASES: &[(&str, &str)] = &[
    // English
    ("en-us", "en"),
    ("en-gb", "en"),
    ("en-au", "en"),
    ("en-ca", "en"),
    ("en-in", "en"),
    ("en-nz", "en"),
    ("eng", "en"),
    // Simplified Chinese
    ("zh-cn", "zh"),
    ("zh-sg", "zh"),
    ("zh-my", "zh"),
    ("zh-hans", "zh"),
    ("zh-hans-cn", "zh"),
    ("zh-hans-sg", "zh"),
    ("zho", "zh"),
    ("chi", "zh"),
    ("cmn", "zh"),
    // Traditional Chinese
    ("zh-tw", "zh-hant"),
    ("zh-hk", "zh-hant"),
    ("zh-mo", "zh-hant"),
    ("zh-hant", "zh-hant"),
    ("zh-hant-tw", "zh-hant"),
    ("zh-hant-hk", "zh-hant"),
    ("zh-hant-mo", "zh-hant"),
    ("cht", "zh-hant"),
    // Japanese / Korean
    ("jp", "ja"),
    ("jpn", "ja"),
    ("kr", "ko"),
    ("kor", "ko"),
    // Deprecated ISO 639-1 codes
    ("iw", "he"),
    ("in", "id"),
    ("ji", "yi"),
    // Norwegian
    ("no", "nb"),
    ("nob", "nb"),
    // Portuguese
    ("pt-br", "pt"),
    ("pt-pt", "pt"),
];

fn lookup_alias(code: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == code)
        .map(|(_, canonical)| *canonical)
}

/// Map an arbitrary locale or alias string to its canonical code.
///
/// Total and pure: unknown input degrades to its primary subtag rather than
/// failing.
pub fn normalize(code: &str) -> String {
    let cleaned = code.trim().to_lowercase().replace('_', "-");

    if let Some(canonical) = lookup_alias(&cleaned) {
        return canonical.to_string();
    }

    let primary = cleaned.split('-').next().unwrap_or("").trim();

    match lookup_alias(primary) {
        Some(canonical) => canonical.to_string(),
        None => primary.to_string(),
    }
}

/// Whether `code` names one language as a whole, i.e. it is a known
/// alias (`zh-hant`, `pt-br`) or has no subtags at all.
pub fn is_single_code(code: &str) -> bool {
    let cleaned = code.trim().to_lowercase().replace('_', "-");
    !cleaned.is_empty() && (lookup_alias(&cleaned).is_some() || !cleaned.contains('-'))
}

/// Canonical `"<from>-<to>"` key for a language pair.
pub fn pair_key(from: &str, to: &str) -> String {
    format!("{}-{}", normalize(from), normalize(to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ==================== Alias Table Tests ====================

    #[test]
    fn test_regional_english_collapses() {
        assert_eq!(normalize("en-US"), "en");
        assert_eq!(normalize("en_GB"), "en");
        assert_eq!(normalize("EN"), "en");
    }

    #[test]
    fn test_simplified_chinese_collapses() {
        assert_eq!(normalize("zh-CN"), "zh");
        assert_eq!(normalize("zh_Hans"), "zh");
        assert_eq!(normalize("zh-Hans-CN"), "zh");
        assert_eq!(normalize("cmn"), "zh");
    }

    #[test]
    fn test_traditional_chinese_is_distinct() {
        assert_eq!(normalize("zh-TW"), "zh-hant");
        assert_eq!(normalize("zh_HK"), "zh-hant");
        assert_eq!(normalize("zh-Hant"), "zh-hant");
        assert_ne!(normalize("zh-TW"), normalize("zh-CN"));
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(normalize("jp"), "ja");
        assert_eq!(normalize("iw"), "he");
        assert_eq!(normalize("no"), "nb");
    }

    // ==================== Fallback Tests ====================

    #[test]
    fn test_unknown_region_uses_primary_subtag() {
        assert_eq!(normalize("de-AT"), "de");
        assert_eq!(normalize("fr_CA"), "fr");
    }

    #[test]
    fn test_primary_subtag_is_rechecked_against_aliases() {
        // "jp-xx" is not in the table but "jp" is
        assert_eq!(normalize("jp-xx"), "ja");
    }

    #[test]
    fn test_unknown_code_passes_through() {
        assert_eq!(normalize("xx"), "xx");
        assert_eq!(normalize("  Fr  "), "fr");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("-"), "");
    }

    #[test]
    fn test_pair_key() {
        assert_eq!(pair_key("en-US", "zh_CN"), "en-zh");
        assert_eq!(pair_key("en", "zh-TW"), "en-zh-hant");
    }

    // ==================== Idempotence ====================

    #[test]
    fn test_is_single_code() {
        assert!(is_single_code("en"));
        assert!(is_single_code("zh-hant"));
        assert!(is_single_code("zh_TW"));
        assert!(is_single_code("pt-BR"));
        assert!(!is_single_code("hant-en"));
        assert!(!is_single_code("en-zh"));
        assert!(!is_single_code(""));
    }

    #[test]
    fn test_every_alias_target_is_a_fixed_point() {
        for (_, canonical) in ALIASES {
            assert_eq!(normalize(canonical), *canonical, "alias target {}", canonical);
        }
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(code in "[A-Za-z_ -]{0,16}") {
            let once = normalize(&code);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalize_alias_variants_is_idempotent(
            index in 0..ALIASES.len(),
            suffix in "(|-[a-z]{2}|_[A-Z]{2})",
        ) {
            let code = format!("{}{}", ALIASES[index].0.to_uppercase(), suffix);
            let once = normalize(&code);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
