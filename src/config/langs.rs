//! Text-to-speech languages
//!
//! Fixed table of language codes accepted by the speech service, with the
//! display names shown to users.

use std::collections::BTreeMap;

/// Language code used when nothing is configured
pub const DEFAULT_LANG: &str = "en";

/// Supported speech languages as (code, display name)
pub const LANGUAGES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("sq", "Albanian"),
    ("ar", "Arabic"),
    ("hy", "Armenian"),
    ("bn", "Bengali"),
    ("ca", "Catalan"),
    ("zh", "Chinese"),
    ("zh-cn", "Chinese (Mandarin/China)"),
    ("zh-tw", "Chinese (Mandarin/Taiwan)"),
    ("zh-yue", "Chinese (Cantonese)"),
    ("hr", "Croatian"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("nl", "Dutch"),
    ("en", "English"),
    ("en-au", "English (Australia)"),
    ("en-uk", "English (United Kingdom)"),
    ("en-us", "English (United States)"),
    ("eo", "Esperanto"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("de", "German"),
    ("el", "Greek"),
    ("hi", "Hindi"),
    ("hu", "Hungarian"),
    ("is", "Icelandic"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("la", "Latin"),
    ("lv", "Latvian"),
    ("mk", "Macedonian"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("pt-br", "Portuguese (Brazil)"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sr", "Serbian"),
    ("sk", "Slovak"),
    ("es", "Spanish"),
    ("es-es", "Spanish (Spain)"),
    ("es-us", "Spanish (United States)"),
    ("sw", "Swahili"),
    ("sv", "Swedish"),
    ("ta", "Tamil"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("vi", "Vietnamese"),
    ("cy", "Welsh"),
];

/// Whether `code` is a supported speech language
pub fn is_supported(code: &str) -> bool {
    LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Display name for a language code
pub fn display_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Language table as an ordered map, for host output
pub fn table() -> BTreeMap<&'static str, &'static str> {
    LANGUAGES.iter().copied().collect()
}
