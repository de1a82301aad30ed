/// A language the user can translate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Languages offered for translation.
pub const LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "it", name: "Italian" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "ru", name: "Russian" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "ko", name: "Korean" },
    Language { code: "zh", name: "Chinese" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "ar", name: "Arabic" },
    Language { code: "ml", name: "Malayalam" },
];

/// Looks a language up by code or display name, ignoring case.
pub fn find(code_or_name: &str) -> Option<&'static Language> {
    let needle = code_or_name.trim();
    LANGUAGES.iter().find(|language| {
        language.code.eq_ignore_ascii_case(needle) || language.name.eq_ignore_ascii_case(needle)
    })
}

/// Name to put in a translation prompt. Unknown languages pass through as
/// given, so free-form names still work.
pub fn display_name(code_or_name: &str) -> &str {
    match find(code_or_name) {
        Some(language) => language.name,
        None => code_or_name.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_codes_and_names() {
        assert_eq!(display_name("es"), "Spanish");
        assert_eq!(display_name("MALAYALAM"), "Malayalam");
        assert_eq!(display_name(" Klingon "), "Klingon");
        assert!(find("xx").is_none());
    }
}
