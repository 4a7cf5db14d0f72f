//! Request and response types for the affirmation endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const NAME_MAX_CHARS: u64 = 60;
pub const FEELING_MIN_CHARS: u64 = 2;
pub const FEELING_MAX_CHARS: u64 = 280;
pub const DETAILS_MAX_CHARS: u64 = 500;

/// Languages an affirmation can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Af,
    La,
    Zh,
    Ru,
    De,
    Fr,
    Es,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::En,
        Language::Af,
        Language::La,
        Language::Zh,
        Language::Ru,
        Language::De,
        Language::Fr,
        Language::Es,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Af => "af",
            Language::La => "la",
            Language::Zh => "zh",
            Language::Ru => "ru",
            Language::De => "de",
            Language::Fr => "fr",
            Language::Es => "es",
        }
    }

    /// Name used when instructing the model.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Af => "Afrikaans",
            Language::La => "Latin",
            Language::Zh => "Mandarin Chinese",
            Language::Ru => "Russian",
            Language::De => "German",
            Language::Fr => "French",
            Language::Es => "Spanish",
        }
    }

    /// Case-insensitive lookup by code.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }

    /// Advisory selector: anything unknown or absent falls back to English.
    pub fn resolve(code: Option<&str>) -> Self {
        code.and_then(Self::from_code).unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Body of `POST /api/affirmation` as received, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAffirmationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub feeling: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// A request that passed every validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffirmationRequest {
    name: String,
    feeling: String,
    details: Option<String>,
    language: Language,
}

impl AffirmationRequest {
    /// Only the validator builds these, so holding one means the fields are in bounds.
    pub(crate) fn new(
        name: String,
        feeling: String,
        details: Option<String>,
        language: Language,
    ) -> Self {
        Self {
            name,
            feeling,
            details,
            language,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feeling(&self) -> &str {
        &self.feeling
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AffirmationResponse {
    pub affirmation: String,
}
