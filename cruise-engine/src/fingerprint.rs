//! Stable identity for question content, derived from its text.

use serde::Serialize;

/// How many leading characters of normalised text identify a question.
const FINGERPRINT_LEN: usize = 100;

/// Dedup key for a question, taken from the first 100 characters of its
/// whitespace-normalised text.
///
/// Two questions with identical leading text are treated as the same
/// question even if later content differs. An accepted approximation, not
/// a hash.
///
/// ```
/// use cruise_engine::Fingerprint;
///
/// let a = Fingerprint::of("Which of these  are\nfederally protected?");
/// let b = Fingerprint::of("Which of these are federally protected?");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        let normalised = text.split_whitespace().collect::<Vec<_>>().join(" ");
        Self(normalised.chars().take(FINGERPRINT_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
