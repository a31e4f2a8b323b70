//! Content-policy mitigation for rejected image prompts.
//!
//! When the image service rejects a prompt (no output URL), the retrier
//! asks [`MitigationEngine::mitigate`] for a safer variant. Levels are
//! cumulative and always start from the *original* prompt:
//!
//! 1. remove NSFW trigger words (case-insensitive),
//! 2. also lower every `:X.X` emphasis weight by a fixed step, floored,
//! 3. also replace facial/expression segments with a mild phrase, when
//!    one is registered for the expression.
//!
//! Every level finishes with the same comma/whitespace cleanup.

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::Expression;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Highest mitigation level with its own transformation.
pub const MAX_MITIGATION_LEVEL: u32 = 3;

/// Amount subtracted from each emphasis weight at level 2.
pub const DEFAULT_EMPHASIS_STEP: f64 = 0.3;

/// Emphasis weights are never lowered below this value.
pub const DEFAULT_EMPHASIS_FLOOR: f64 = 1.0;

static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\d\.\d+)").expect("valid regex"));

static FACIAL_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(expression|face|eyes|eyebrows|mouth|gaze|look)").expect("valid regex")
});

static REPEATED_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(?:\s*,)+").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// MitigationRules
// ---------------------------------------------------------------------------

/// Word lists and tuning values driving the mitigation levels.
#[derive(Debug, Clone, PartialEq)]
pub struct MitigationRules {
    /// Removed at level 1. Longer phrases should precede their substrings.
    pub trigger_words: Vec<String>,
    /// Replacement phrase per expression used at level 3.
    pub mild_expressions: Vec<(Expression, String)>,
    pub emphasis_step: f64,
    pub emphasis_floor: f64,
}

impl Default for MitigationRules {
    fn default() -> Self {
        let trigger_words = [
            "tears in eyes",
            "tears",
            "crying",
            "weeping",
            "sobbing",
            "intense eyes",
            "sharp gaze",
            "aggressive",
            "passionate",
            "fierce",
            "violent",
        ];
        Self {
            trigger_words: trigger_words.iter().map(|w| w.to_string()).collect(),
            mild_expressions: vec![
                (
                    Expression::Sad,
                    "gentle sad expression, soft melancholic look, thoughtful gaze, quiet sadness"
                        .to_string(),
                ),
                (
                    Expression::Angry,
                    "serious expression, determined face, focused look, firm expression".to_string(),
                ),
            ],
            emphasis_step: DEFAULT_EMPHASIS_STEP,
            emphasis_floor: DEFAULT_EMPHASIS_FLOOR,
        }
    }
}

// ---------------------------------------------------------------------------
// MitigationEngine
// ---------------------------------------------------------------------------

/// Pure prompt rewriter. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct MitigationEngine {
    rules: MitigationRules,
    trigger_patterns: Vec<Regex>,
}

impl MitigationEngine {
    /// Compile the trigger-word patterns for `rules`.
    pub fn new(rules: MitigationRules) -> Result<Self, CoreError> {
        let trigger_patterns = rules
            .trigger_words
            .iter()
            .filter(|word| !word.trim().is_empty())
            .map(|word| {
                Regex::new(&format!("(?i){}", regex::escape(word))).map_err(|e| {
                    CoreError::Validation(format!("Invalid trigger word '{word}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            trigger_patterns,
        })
    }

    pub fn rules(&self) -> &MitigationRules {
        &self.rules
    }

    /// Mild replacement phrase registered for `expression`, if any.
    pub fn mild_phrase(&self, expression: Expression) -> Option<&str> {
        self.rules
            .mild_expressions
            .iter()
            .find(|(e, _)| *e == expression)
            .map(|(_, phrase)| phrase.as_str())
    }

    /// Produce the level-`level` variant of `original`.
    ///
    /// Level 0 returns the prompt untouched; levels above
    /// [`MAX_MITIGATION_LEVEL`] behave like the maximum level.
    pub fn mitigate(&self, original: &str, expression: Expression, level: u32) -> String {
        if level == 0 {
            return original.to_string();
        }

        let mut prompt = self.strip_trigger_words(original);

        if level >= 2 {
            prompt = self.reduce_emphasis(&prompt);
        }

        if level >= 3 {
            if let Some(mild) = self.mild_phrase(expression) {
                prompt = replace_facial_segments(&prompt, mild);
            }
        }

        clean_up(&prompt)
    }

    fn strip_trigger_words(&self, prompt: &str) -> String {
        self.trigger_patterns
            .iter()
            .fold(prompt.to_string(), |acc, pattern| {
                pattern.replace_all(&acc, "").into_owned()
            })
    }

    fn reduce_emphasis(&self, prompt: &str) -> String {
        EMPHASIS_RE
            .replace_all(prompt, |caps: &regex::Captures<'_>| {
                // The pattern only matches `\d\.\d+`, which always parses.
                let value: f64 = caps[1].parse().unwrap_or(self.rules.emphasis_floor);
                let lowered = (value - self.rules.emphasis_step).max(self.rules.emphasis_floor);
                format!(":{lowered:.1}")
            })
            .into_owned()
    }
}

/// Drop comma-delimited segments mentioning the face and lead with `mild`.
fn replace_facial_segments(prompt: &str, mild: &str) -> String {
    let kept = prompt
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !FACIAL_SEGMENT_RE.is_match(segment));

    std::iter::once(mild)
        .chain(kept)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse repeated commas and whitespace, trim edge punctuation.
fn clean_up(prompt: &str) -> String {
    let collapsed = REPEATED_COMMA_RE.replace_all(prompt, ", ");
    let collapsed = WHITESPACE_RE.replace_all(&collapsed, " ");
    collapsed
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
