//! Avatar generation status machine, run defaults, and notification text.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::TokenAmount;

// ---------------------------------------------------------------------------
// Run defaults
// ---------------------------------------------------------------------------

/// Attempts per cell before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Delay between a rejected attempt and the next one.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3;
pub const DEFAULT_IMAGE_WIDTH: u32 = 512;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 512;
/// Model used when the avatar has no `draw_model_version`.
pub const DEFAULT_DRAW_MODEL: &str = "anything-v4.0";
/// Model name reported for chat pricing and usage logs.
pub const DEFAULT_CHAT_PRICING_MODEL: &str = "gpt-4";

/// How long a claim stays valid without renewal before another worker
/// may take the avatar over.
pub const DEFAULT_CLAIM_LEASE_SECS: u64 = 600;

/// Reason recorded on the token transaction of a run.
pub const TOKEN_CONSUME_REASON: &str = "アバター画像生成";

// ---------------------------------------------------------------------------
// AvatarGenerationStatus
// ---------------------------------------------------------------------------

/// Lifecycle of one generation run, stored on the avatar row.
///
/// `Pending -> Generating -> Completed | Failed`. A run that fails before
/// `Generating` is written goes straight to `Failed`. A new run may move a
/// terminal avatar back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarGenerationStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl AvatarGenerationStatus {
    pub const ALL: [AvatarGenerationStatus; 4] = [
        Self::Pending,
        Self::Generating,
        Self::Completed,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown avatar generation status '{other}'"
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is allowed.
    pub fn can_transition_to(&self, next: Self) -> bool {
        use AvatarGenerationStatus::*;
        matches!(
            (self, next),
            (Pending, Generating)
                | (Pending, Failed)
                | (Generating, Completed)
                | (Generating, Failed)
                | (Completed, Pending)
                | (Failed, Pending)
        )
    }

    /// Statuses from which `self` may be written.
    pub fn predecessors(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(self))
            .collect()
    }

    pub fn validate_transition(&self, next: Self) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

impl std::fmt::Display for AvatarGenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Notification text
// ---------------------------------------------------------------------------

/// Model label shown in notifications when the avatar has none set.
pub const NOTIFICATION_DEFAULT_MODEL_LABEL: &str = "default model";

pub fn notification_title(success: bool) -> &'static str {
    if success {
        "アバター画像の生成が完了しました"
    } else {
        "アバター画像の生成に失敗しました。"
    }
}

pub fn notification_body(success: bool, model: Option<&str>, total: TokenAmount) -> String {
    let model = model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(NOTIFICATION_DEFAULT_MODEL_LABEL);
    if success {
        format!(
            "アバター画像の生成が完了しました！\n使用モデル: {model}\n合計トークンコスト: {total}トークン\n教師アバターページで新しいアバターを確認してください。"
        )
    } else {
        format!(
            "アバター画像の生成に失敗しました。\n使用モデル: {model}\n合計トークンコスト: {total}トークン\n再度お試しください。"
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
