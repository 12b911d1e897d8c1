//! Common types and utilities shared across Cruise crates.
//!
//! This crate defines runtime settings, the answer lexicons, completion
//! phrase sets, observability helpers, and shared error types used
//! throughout the Cruise workspace. It is intentionally lightweight and
//! dependency‑minimal so that all crates can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`EngineSettings`]: Tick cadence, playback speed, and activation delays
//! - [`DriverSettings`]: WebDriver endpoint and target module location
//! - [`AnswerLexicons`]: The pluggable term tables driving answer selection
//! - [`CompletionPhrases`]: Injectable phrase groups that end a run
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`CruiseError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! Constructing default settings:
//!
//! ```rust
//! use cruise_common::{EngineSettings, StealthLevel};
//!
//! let mut settings = EngineSettings::default();
//! settings.stealth = StealthLevel::Maximum;
//! assert_eq!(settings.check_interval_ms, 800);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Runtime settings for the automation engine.
///
/// Fixed delays the engine's contracts hard-code (advance activation delay,
/// quiz cool-down, stuck threshold) are not configurable; only the knobs the
/// operator is expected to tune live here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Playback rate requested for every medium before falling back.
    pub playback_rate: f64,
    /// Milliseconds between pipeline ticks.
    pub check_interval_ms: u64,
    /// Milliseconds to wait before activating a chosen answer control, and
    /// the per-item stagger for drag selections.
    pub click_delay_ms: u64,
    /// Emit verbose per-tick diagnostics.
    pub debug: bool,
    /// Stealth posture applied by the browser driver.
    pub stealth: StealthLevel,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            playback_rate: 16.0,
            check_interval_ms: 800,
            click_delay_ms: 300,
            debug: true,
            stealth: StealthLevel::Balanced,
        }
    }
}

/// Browser automation stealth posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    Off,
    Lightweight,
    Balanced,
    Maximum,
}

/// Where and how the browser driver connects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    /// WebDriver endpoint (Chromedriver by default).
    pub webdriver_url: String,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Optional module URL to open before the engine starts; when absent the
    /// driver attaches to whatever the operator already navigated to.
    pub target_url: Option<String>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            target_url: None,
        }
    }
}

/// A flat list of lowercase terms matched by substring against element text.
///
/// ```
/// use cruise_common::Lexicon;
///
/// let lx = Lexicon::new(["race", "religion"]);
/// assert_eq!(lx.hit("Religion or belief"), Some("religion"));
/// assert_eq!(lx.hit("Favorite color of shirt"), None);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lexicon {
    terms: Vec<String>,
}

impl Lexicon {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// First term contained in `text` (case-insensitive), if any.
    pub fn hit(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| lowered.contains(term.to_lowercase().as_str()))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// The term tables that drive answer selection.
///
/// These are data, not code: the defaults cover US workplace-conduct
/// training, and deployments against other module families override them
/// wholesale through configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerLexicons {
    /// Drag items matching one of these qualify for selection.
    pub protected_terms: Lexicon,
    /// Drag items matching one of these are never selected, even when a
    /// protected term also matches.
    pub excluded_terms: Lexicon,
    /// Question text matching one of these answers True.
    pub affirm_patterns: Lexicon,
    /// Question text matching one of these answers False.
    pub dismiss_patterns: Lexicon,
    /// Multiple-choice labels matching one of these are preferred.
    pub preferred_answers: Lexicon,
}

impl Default for AnswerLexicons {
    fn default() -> Self {
        Self {
            protected_terms: Lexicon::new([
                "national origin",
                "age (40 or older)",
                "age",
                "genetic information",
                "sex",
                "disability",
                "race",
                "religion",
                "pregnancy",
                "color",
                "veteran status",
                "sexual orientation",
            ]),
            excluded_terms: Lexicon::new([
                "marital status",
                "political affiliation",
                "personal style",
                "height",
                "weight",
            ]),
            affirm_patterns: Lexicon::new([
                "harassment",
                "discrimination",
                "report",
                "tell",
                "supervisor",
                "manager",
                "appropriate",
                "professional",
                "training",
                "policy",
                "required",
                "hostile environment",
                "retaliation",
                "witness",
            ]),
            dismiss_patterns: Lexicon::new([
                "personal style",
                "preference",
                "ignore",
                "not your problem",
                "joke",
                "harmless",
                "overreacting",
            ]),
            preferred_answers: Lexicon::new([
                "report",
                "manager",
                "supervisor",
                "hr",
                "human resources",
                "policy",
                "appropriate",
            ]),
        }
    }
}

/// Phrase groups that mark the module as finished.
///
/// A group matches when every literal in it appears in the surface text
/// (case-insensitive); any matching group ends the run. Kept injectable
/// because literal phrase matching is fragile across module vendors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionPhrases {
    groups: Vec<Vec<String>>,
}

impl CompletionPhrases {
    pub fn new<I, G, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups
                .into_iter()
                .map(|g| g.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// True when any non-empty group has all of its phrases in `text`.
    pub fn matched(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.groups.iter().any(|group| {
            !group.is_empty()
                && group
                    .iter()
                    .all(|phrase| lowered.contains(phrase.to_lowercase().as_str()))
        })
    }
}

impl Default for CompletionPhrases {
    fn default() -> Self {
        Self::new([
            vec!["100%", "complete", "course"],
            vec!["congratulations", "completed"],
            vec!["you have successfully completed"],
            vec!["course completion"],
        ])
    }
}

/// Error types used across the Cruise system.
#[derive(thiserror::Error, Debug)]
pub enum CruiseError {
    /// The engine failed to complete a requested operation.
    #[error("Engine error: {0}")]
    Engine(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`CruiseError`].
pub type Result<T> = std::result::Result<T, CruiseError>;
