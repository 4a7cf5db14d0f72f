use crate::error::{AffirmError, Result};
use crate::model::{
    AffirmationRequest, Language, RawAffirmationRequest, DETAILS_MAX_CHARS, FEELING_MAX_CHARS,
    FEELING_MIN_CHARS, NAME_MAX_CHARS,
};
use regex::Regex;
use std::sync::LazyLock;
use validator::ValidateLength;

pub const INVALID_PAYLOAD: &str = "Invalid request payload.";
pub const NAME_REQUIRED: &str = "Please tell us your name.";
pub const NAME_TOO_LONG: &str = "Name must be 60 characters or fewer.";
pub const NAME_INVALID_CHARACTERS: &str = "Name must contain valid characters.";
pub const FEELING_REQUIRED: &str = "Please describe how you are feeling.";
pub const FEELING_TOO_SHORT: &str = "Please describe your feeling in at least 2 characters.";
pub const FEELING_TOO_LONG: &str = "Feeling must be 280 characters or fewer.";
pub const FEELING_HAS_EMOJI: &str =
    "Please use descriptive text instead of emoji for your feeling.";
pub const FEELING_NEEDS_WORDS: &str = "Please use valid words to describe your feeling.";
pub const FEELING_NOT_DESCRIPTIVE: &str =
    "Please be more descriptive, for example: 'anxious about my presentation'.";
pub const DETAILS_TOO_LONG: &str = "Details must be 500 characters or fewer.";

const MIN_LETTERS: usize = 3;
const MIN_SINGLE_WORD_CHARS: usize = 5;

static PICTOGRAPHIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F300}-\x{1F6FF}",
        r"\x{1F700}-\x{1F77F}",
        r"\x{1F780}-\x{1F7FF}",
        r"\x{1F800}-\x{1F8FF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{1FA00}-\x{1FAFF}",
        r"\x{2700}-\x{27BF}",
        r"\x{2600}-\x{26FF}",
        "]",
    ))
    .expect("pictographic character class is a valid regex")
});

/// Shorthand feelings and the word we suggest instead.
const SHORTHAND_SUGGESTIONS: [(&str, &str); 4] = [
    ("anx", "anxious"),
    ("strs", "stressed"),
    ("dep", "depressed"),
    ("conf", "confused"),
];

/// Structural and heuristic validation of affirmation requests
pub struct InputValidator;

impl InputValidator {
    /// Decodes a request body. Missing fields are left for `validate` to report.
    pub fn decode(body: &[u8]) -> Result<RawAffirmationRequest> {
        serde_json::from_slice(body).map_err(|_| invalid(INVALID_PAYLOAD))
    }

    /// Runs every check in order and stops at the first failure.
    pub fn validate(raw: &RawAffirmationRequest) -> Result<AffirmationRequest> {
        let name = Self::validate_name(raw.name.as_deref().unwrap_or_default())?;
        let feeling = Self::validate_feeling(raw.feeling.as_deref().unwrap_or_default())?;
        let details = Self::validate_details(raw.details.as_deref())?;
        let language = Language::resolve(raw.language.as_deref());

        Ok(AffirmationRequest::new(name, feeling, details, language))
    }

    /// Trims and bounds the name, then strips anything but letters, digits,
    /// spaces, hyphens and apostrophes.
    pub fn validate_name(name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid(NAME_REQUIRED));
        }
        if !name.validate_length(Some(1), Some(NAME_MAX_CHARS), None) {
            return Err(invalid(NAME_TOO_LONG));
        }

        let cleaned: String = name
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '\''))
            .collect();
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Err(invalid(NAME_INVALID_CHARACTERS));
        }

        Ok(cleaned.to_string())
    }

    /// Applies the descriptiveness heuristic to a feeling.
    pub fn validate_feeling(feeling: &str) -> Result<String> {
        let feeling = feeling.trim();
        if feeling.is_empty() {
            return Err(invalid(FEELING_REQUIRED));
        }
        // Before the length bounds so a lone emoji gets the emoji message
        if PICTOGRAPHIC.is_match(feeling) {
            return Err(invalid(FEELING_HAS_EMOJI));
        }
        if !feeling.validate_length(Some(FEELING_MIN_CHARS), None, None) {
            return Err(invalid(FEELING_TOO_SHORT));
        }
        if !feeling.validate_length(None, Some(FEELING_MAX_CHARS), None) {
            return Err(invalid(FEELING_TOO_LONG));
        }

        let letters = feeling.chars().filter(|c| c.is_alphabetic()).count();
        if letters < MIN_LETTERS {
            return Err(invalid(FEELING_NEEDS_WORDS));
        }

        let mut words = feeling
            .split_whitespace()
            .filter(|word| word.chars().any(char::is_alphabetic));
        if let (Some(word), None) = (words.next(), words.next()) {
            if word.chars().count() < MIN_SINGLE_WORD_CHARS {
                return Err(match Self::shorthand_suggestion(word) {
                    Some(suggestion) => AffirmError::Validation(format!(
                        "Did you mean '{}'? Please use a full descriptive word.",
                        suggestion
                    )),
                    None => invalid(FEELING_NOT_DESCRIPTIVE),
                });
            }
        }

        Ok(feeling.to_string())
    }

    /// Looks up the full word for a known shorthand, ignoring case and
    /// surrounding punctuation.
    pub fn shorthand_suggestion(word: &str) -> Option<&'static str> {
        let word = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        SHORTHAND_SUGGESTIONS
            .iter()
            .find(|(shorthand, _)| *shorthand == word)
            .map(|(_, full)| *full)
    }

    /// Blank details count as absent.
    pub fn validate_details(details: Option<&str>) -> Result<Option<String>> {
        let Some(details) = details.map(str::trim).filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        if !details.validate_length(None, Some(DETAILS_MAX_CHARS), None) {
            return Err(invalid(DETAILS_TOO_LONG));
        }
        Ok(Some(details.to_string()))
    }
}

fn invalid(message: &str) -> AffirmError {
    AffirmError::Validation(message.to_string())
}
