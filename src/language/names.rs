//! Localized language names.
//!
//! Some clients send display names ("中文(简体)", "English") instead of codes.
//! Only the name-based compatibility endpoint consults this table; its result
//! is then passed through `normalize` like any other code.

/// (display name, canonical code). The first entry for a code is the name
/// reported back to clients.
const NAMES: &[(&str, &str)] = &[
    ("中文(简体)", "zh"),
    ("中文(繁体)", "zh-hant"),
    ("英语", "en"),
    ("日语", "ja"),
    ("韩语", "ko"),
    ("法语", "fr"),
    ("德语", "de"),
    ("西班牙语", "es"),
    ("俄语", "ru"),
    ("意大利语", "it"),
    ("葡萄牙语", "pt"),
    ("荷兰语", "nl"),
    ("波兰语", "pl"),
    ("土耳其语", "tr"),
    ("乌克兰语", "uk"),
    ("阿拉伯语", "ar"),
    ("越南语", "vi"),
    ("泰语", "th"),
    ("印尼语", "id"),
    ("中文", "zh"),
    ("简体中文", "zh"),
    ("繁体中文", "zh-hant"),
    ("繁體中文", "zh-hant"),
    ("English", "en"),
    ("Chinese", "zh"),
    ("Chinese (Simplified)", "zh"),
    ("Chinese (Traditional)", "zh-hant"),
    ("Japanese", "ja"),
    ("日本語", "ja"),
    ("Korean", "ko"),
    ("한국어", "ko"),
    ("French", "fr"),
    ("Français", "fr"),
    ("German", "de"),
    ("Deutsch", "de"),
    ("Spanish", "es"),
    ("Español", "es"),
    ("Russian", "ru"),
    ("Русский", "ru"),
    ("Italian", "it"),
    ("Portuguese", "pt"),
];

/// Look up the canonical code for a display name. Matching ignores
/// surrounding whitespace and ASCII case.
pub fn code_for_name(name: &str) -> Option<&'static str> {
    let name = name.trim();
    NAMES
        .iter()
        .find(|(display, _)| display.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Display name for a canonical code, as reported back to name-based clients.
pub fn name_for_code(code: &str) -> Option<&'static str> {
    NAMES
        .iter()
        .find(|(_, candidate)| *candidate == code)
        .map(|(display, _)| *display)
}
