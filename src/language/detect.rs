//! Language identification for requests without an explicit source language.

use super::normalize;
use isolang::Language;
use tracing::debug;

/// Identifies the language of a text.
///
/// Implementations never fail: short or ambiguous input yields a default code.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> String;
}

/// Detector backed by `whichlang`.
#[derive(Debug, Clone)]
pub struct WhichlangDetector {
    fallback: String,
}

impl WhichlangDetector {
    pub fn new(fallback: &str) -> Self {
        Self {
            fallback: normalize(fallback),
        }
    }
}

impl Default for WhichlangDetector {
    fn default() -> Self {
        Self::new("en")
    }
}

impl LanguageDetector for WhichlangDetector {
    fn detect(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return self.fallback.clone();
        }

        let three_letter = whichlang::detect_language(text).three_letter_code();
        match iso_639_1(three_letter) {
            Some(code) => normalize(code),
            None => {
                debug!("No ISO 639-1 code for detected language '{}'", three_letter);
                self.fallback.clone()
            }
        }
    }
}

fn iso_639_1(three_letter: &str) -> Option<&'static str> {
    // Mandarin has no 639-1 code of its own
    if three_letter == "cmn" {
        return Some("zh");
    }
    Language::from_639_3(three_letter).and_then(|lang| lang.to_639_1())
}
