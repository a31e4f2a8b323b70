//! Pose and expression catalog for avatar image generation.
//!
//! The catalog is plain configuration data: [`GenerationCatalog::default`]
//! returns the shipped poses and expression phrases, and callers may
//! construct their own catalog (e.g. in tests) without touching any
//! global state.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Pose keys
// ---------------------------------------------------------------------------

/// Full-body standing pose.
pub const POSE_FULL_BODY: &str = "full_body";
/// Upper-body portrait.
pub const POSE_BUST: &str = "bust";

// ---------------------------------------------------------------------------
// Expression
// ---------------------------------------------------------------------------

/// Facial expression rendered for one cell of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Normal,
    Happy,
    Sad,
    Angry,
    Surprised,
}

impl Expression {
    /// Every expression, in catalog order.
    pub const ALL: [Expression; 5] = [
        Expression::Normal,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Surprised,
    ];

    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Normal => "normal",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Surprised => "surprised",
        }
    }

    /// Parse from the database value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "normal" => Ok(Expression::Normal),
            "happy" => Ok(Expression::Happy),
            "sad" => Ok(Expression::Sad),
            "angry" => Ok(Expression::Angry),
            "surprised" => Ok(Expression::Surprised),
            other => Err(CoreError::Validation(format!(
                "Unknown expression '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PoseDefinition
// ---------------------------------------------------------------------------

/// One entry of the pose catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDefinition {
    /// Stable key stored as `image_type` on persisted artifacts.
    pub key: String,
    /// Human-readable label used in usage line items.
    pub label: String,
    /// Prompt fragment describing the pose.
    pub description: String,
    pub enabled: bool,
    pub expressions: Vec<Expression>,
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One (pose, expression) pair processed independently by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub pose_key: String,
    pub pose_label: String,
    pub pose_description: String,
    pub expression: Expression,
}

// ---------------------------------------------------------------------------
// GenerationCatalog
// ---------------------------------------------------------------------------

/// Immutable pose list plus expression phrases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationCatalog {
    pub poses: Vec<PoseDefinition>,
    pub expression_prompts: Vec<(Expression, String)>,
}

impl Default for GenerationCatalog {
    fn default() -> Self {
        Self {
            poses: vec![
                PoseDefinition {
                    key: POSE_FULL_BODY.to_string(),
                    label: "全身".to_string(),
                    description: "full body standing pose, showing entire body from head to toe, \
                                  centered composition, vertical orientation, simple pose"
                        .to_string(),
                    enabled: true,
                    expressions: vec![Expression::Normal],
                },
                PoseDefinition {
                    key: POSE_BUST.to_string(),
                    label: "バストアップ".to_string(),
                    description: "upper body portrait from shoulders up, close-up view, \
                                  face clearly visible, detailed facial features, centered"
                        .to_string(),
                    enabled: true,
                    expressions: Expression::ALL.to_vec(),
                },
            ],
            expression_prompts: vec![
                (
                    Expression::Normal,
                    "(neutral expression:1.2), calm face, relaxed eyebrows, cheerful eyes, \
                     slight smile, gentle mood, peaceful look"
                        .to_string(),
                ),
                (
                    Expression::Happy,
                    "(happy expression:1.3), bright smile, joyful face, smiling eyes, \
                     cheerful mood, positive emotion, delighted look"
                        .to_string(),
                ),
                (
                    Expression::Sad,
                    "(sad expression:1.2), melancholic face, gentle downcast eyes, slight frown, \
                     thoughtful expression, soft eyebrows, pensive look"
                        .to_string(),
                ),
                (
                    Expression::Angry,
                    "(serious expression:1.2), stern face, determined look, focused eyebrows, \
                     firm mouth, strong gaze, resolute expression"
                        .to_string(),
                ),
                (
                    Expression::Surprised,
                    "(surprised expression:1.3), shocked face, wide open eyes, raised eyebrows, \
                     open mouth, astonished look, amazed expression"
                        .to_string(),
                ),
            ],
        }
    }
}

impl GenerationCatalog {
    /// Emphasis-weighted phrase for an expression, or `""` if none is registered.
    pub fn expression_prompt(&self, expression: Expression) -> &str {
        self.expression_prompts
            .iter()
            .find(|(e, _)| *e == expression)
            .map(|(_, prompt)| prompt.as_str())
            .unwrap_or("")
    }

    /// Filter the catalog down to the poses a profile should render.
    ///
    /// Disabled poses are dropped. Chibi characters skip [`POSE_BUST`]
    /// entirely and render every expression on [`POSE_FULL_BODY`].
    pub fn enabled_poses(&self, is_chibi: bool) -> Vec<PoseDefinition> {
        self.poses
            .iter()
            .filter(|pose| pose.enabled)
            .filter(|pose| !(is_chibi && pose.key == POSE_BUST))
            .map(|pose| {
                let mut pose = pose.clone();
                if is_chibi && pose.key == POSE_FULL_BODY {
                    pose.expressions = Expression::ALL.to_vec();
                }
                pose
            })
            .collect()
    }

    /// Flatten the enabled poses into cells, in catalog order.
    pub fn cells(&self, is_chibi: bool) -> Vec<Cell> {
        self.enabled_poses(is_chibi)
            .into_iter()
            .flat_map(|pose| {
                pose.expressions
                    .iter()
                    .map(|expression| Cell {
                        pose_key: pose.key.clone(),
                        pose_label: pose.label.clone(),
                        pose_description: pose.description.clone(),
                        expression: *expression,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
