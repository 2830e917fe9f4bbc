use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Pt,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Pt, Language::En];

    /// Used when the requested translation is missing.
    pub const FALLBACK: Language = Language::Pt;

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pt" | "pt-pt" | "pt_pt" => Ok(Language::Pt),
            "en" | "en-gb" | "en-us" | "en_gb" | "en_us" => Ok(Language::En),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// Text stored per language, e.g. `{"pt": "Jogo do lenço", "en": "Steal the bacon"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<Language, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, language: Language, text: impl Into<String>) -> Self {
        self.set(language, text);
        self
    }

    pub fn set(&mut self, language: Language, text: impl Into<String>) {
        self.0.insert(language, text.into());
    }

    /// Exact translation, blank strings count as missing.
    pub fn get(&self, language: Language) -> Option<&str> {
        self.0
            .get(&language)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    /// Requested language, then [`Language::FALLBACK`], then any translation, then `""`.
    pub fn resolve(&self, language: Language) -> &str {
        self.get(language)
            .or_else(|| self.get(Language::FALLBACK))
            .or_else(|| Language::ALL.iter().find_map(|lang| self.get(*lang)))
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        Language::ALL.iter().all(|lang| self.get(*lang).is_none())
    }

    pub(crate) fn contains_ignore_case(&self, needle_lower: &str) -> bool {
        self.0
            .values()
            .any(|text| text.to_lowercase().contains(needle_lower))
    }
}

impl<S: Into<String>> FromIterator<(Language, S)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (Language, S)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(lang, text)| (lang, text.into()))
                .collect(),
        )
    }
}
