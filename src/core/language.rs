//! Language catalog: code to native display name.

/// Supported language codes and the names the backends are prompted with.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("zh-Hans", "中文"),
    ("zh-Hant", "繁體中文"),
    ("en", "English"),
    ("ja", "日本語"),
    ("ko", "한국어"),
    ("fr", "Français"),
    ("de", "Deutsch"),
    ("es", "Español"),
    ("it", "Italiano"),
    ("pt", "Português"),
    ("pt-PT", "Português (Portugal)"),
    ("ru", "Русский"),
    ("vi", "Tiếng Việt"),
    ("th", "ไทย"),
    ("hi", "हिन्दी"),
    ("ar", "العربية"),
    ("tr", "Türkçe"),
    ("pl", "Polski"),
    ("nl", "Nederlands"),
    ("sv", "Svenska"),
    ("da", "Dansk"),
    ("no", "Norsk"),
    ("nb", "Norsk Bokmål"),
    ("fi", "Suomi"),
    ("cs", "Čeština"),
    ("sk", "Slovenčina"),
    ("hu", "Magyar"),
    ("ro", "Română"),
    ("bg", "български"),
    ("hr", "Hrvatski"),
    ("sl", "Slovenščina"),
    ("et", "Eesti"),
    ("lv", "Latviešu"),
    ("lt", "Lietuvių"),
    ("mt", "Malti"),
    ("el", "Ελληνικά"),
    ("ca", "Català"),
    ("eu", "Euskara"),
    ("gl", "Galego"),
    ("af", "Afrikaans"),
    ("zu", "IsiZulu"),
    ("xh", "isiXhosa"),
    ("st", "Sesotho"),
    ("sw", "Kiswahili"),
    ("yo", "Èdè Yorùbá"),
    ("ig", "Asụsụ Igbo"),
    ("ha", "Hausa"),
    ("am", "አማርኛ"),
    ("or", "ଓଡ଼ିଆ"),
    ("bn", "বাংলা"),
    ("gu", "ગુજરાતી"),
    ("pa", "ਪੰਜਾਬੀ"),
    ("te", "తెలుగు"),
    ("kn", "ಕನ್ನಡ"),
    ("ml", "മലയാളം"),
    ("ta", "தமிழ்"),
    ("si", "සිංහල"),
    ("my", "မြန်မာဘာသာ"),
    ("km", "ភាសាខ្មែរ"),
    ("lo", "ລາວ"),
    ("ne", "नेपाली"),
    ("ur", "اردو"),
    ("fa", "فارسی"),
    ("ps", "پښتو"),
    ("sd", "سنڌي"),
    ("he", "עברית"),
    ("yue", "粵語"),
];

/// Display name for a language code, or the code itself when unknown.
pub fn display_name(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(code, |&(_, name)| name)
}

/// Whether the code is in the catalog.
pub fn is_known(code: &str) -> bool {
    LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Display names joined the way the combined prompt lists them.
pub fn joined_display_names(codes: &[String]) -> String {
    codes
        .iter()
        .map(|c| display_name(c))
        .collect::<Vec<_>>()
        .join("、")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_known() {
        assert_eq!(display_name("fr"), "Français");
        assert_eq!(display_name("zh-Hans"), "中文");
        assert_eq!(display_name("yue"), "粵語");
    }

    #[test]
    fn test_display_name_falls_back_to_code() {
        assert_eq!(display_name("tlh"), "tlh");
        assert_eq!(display_name(""), "");
        assert!(!is_known("EN")); // Case sensitive
    }

    #[test]
    fn test_catalog_has_unique_codes() {
        for (i, (code, _)) in LANGUAGES.iter().enumerate() {
            assert!(
                LANGUAGES[i + 1..].iter().all(|(c, _)| c != code),
                "duplicate code {code}"
            );
        }
    }

    #[test]
    fn test_joined_display_names() {
        let codes = vec!["en".to_string(), "ja".to_string()];
        assert_eq!(joined_display_names(&codes), "English、日本語");
    }
}
