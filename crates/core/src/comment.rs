//! Comment catalog and prompt builder for avatar event comments.
//!
//! Every event type in [`EVENT_TYPES`] receives one comment per avatar.
//! The LLM prompt is themed by the avatar's personality axes; when the
//! LLM cannot produce a comment the fixed default for the event is used.

use crate::profile::{CharacterProfile, Personality, Theme};

// ---------------------------------------------------------------------------
// Event catalog
// ---------------------------------------------------------------------------

/// Event types that receive an avatar comment, in processing order.
pub const EVENT_TYPES: &[&str] = &[
    "task_created",
    "task_updated",
    "task_completed",
    "task_breakdown",
    "task_breakdown_refine",
    "group_task_created",
    "group_task_updated",
    "login",
    "logout",
    "login_gap",
    "token_purchased",
    "performance_personal_viewed",
    "performance_group_viewed",
    "tag_created",
    "tag_updated",
    "tag_deleted",
    "group_created",
    "group_edited",
    "group_deleted",
];

/// Default comment for event types missing from the catalog.
pub const DEFAULT_FALLBACK_COMMENT: &str = "頑張りましょう！";

/// Scene used for event types missing from the catalog.
const UNKNOWN_SCENE: &str = "ユーザーが何かアクションを起こしたとき";

/// Suffix appended to the scene for child-theme users.
const CHILD_SCENE_SUFFIX: &str = "（子ども向け）";

/// Situation shown to the LLM for `event_type`.
pub fn scene_description(event_type: &str) -> &'static str {
    match event_type {
        "task_created" => "ユーザーが新しいタスクを作成したとき",
        "task_updated" => "ユーザーがタスクを更新したとき",
        "task_completed" => "ユーザーがタスクを完了したとき",
        "task_breakdown" => "ユーザーがタスクを細かいステップに分解したとき",
        "task_breakdown_refine" => "ユーザーが分解したタスクを見直そうとしているとき",
        "group_task_created" => "ユーザーがグループタスクを作成したとき",
        "group_task_updated" => "ユーザーがグループタスクを更新したとき",
        "login" => "ユーザーがログインしたとき",
        "logout" => "ユーザーがログアウトするとき",
        "login_gap" => "ユーザーが久しぶりにログインしたとき",
        "token_purchased" => "ユーザーがトークンを購入したとき",
        "performance_personal_viewed" => "ユーザーが自分の実績を確認したとき",
        "performance_group_viewed" => "ユーザーがグループの実績を確認したとき",
        "tag_created" => "ユーザーが新しいタグを作成したとき",
        "tag_updated" => "ユーザーがタグを更新したとき",
        "tag_deleted" => "ユーザーがタグを削除したとき",
        "group_created" => "ユーザーが新しいグループを作成したとき",
        "group_edited" => "ユーザーがグループを編集したとき",
        "group_deleted" => "ユーザーがグループを削除したとき",
        _ => UNKNOWN_SCENE,
    }
}

/// Fixed comment stored when generation fails for `event_type`.
pub fn default_comment(event_type: &str) -> &'static str {
    match event_type {
        "task_created" => "新しいタスクですね。一緒に頑張りましょう！",
        "task_updated" => "タスクが更新されましたね。引き続き頑張りましょう！",
        "task_completed" => "よく頑張りましたね。素晴らしいです！",
        "task_breakdown" => "タスクを分解して、少しずつ進めていきましょう。",
        "task_breakdown_refine" => "もう一度見直しましょうか。どうしますか？",
        "group_task_created" => "グループタスクですね。協力して進めましょう。",
        "group_task_updated" => "グループタスクが更新されました。確認しましょう。",
        "login" => "おかえりなさい！今日も頑張りましょう。",
        "logout" => "お疲れ様でした。また明日お会いしましょう。",
        "login_gap" => "お久しぶりですね。無理せず進めていきましょう。",
        "token_purchased" => "ありがとうございます。引き続きサポートします！",
        "performance_personal_viewed" => "素晴らしい実績ですね。努力が実っていますよ。",
        "performance_group_viewed" => "グループメンバーの頑張りが見えますね。",
        "tag_created" => "新しいタグを作成しましたね。整理が大切です。",
        "tag_updated" => "タグを更新しましたね。",
        "tag_deleted" => "タグを削除しましたね。すっきりしましたか？",
        "group_created" => "新しいグループですね。おめでとうございます！",
        "group_edited" => "グループを編集しましたね。より良くなりますよ。",
        "group_deleted" => "グループを削除しましたね。お疲れ様でした。",
        _ => DEFAULT_FALLBACK_COMMENT,
    }
}

// ---------------------------------------------------------------------------
// Personality vocabulary
// ---------------------------------------------------------------------------

/// Japanese description of each personality axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonalityDescription {
    pub tone: &'static str,
    pub enthusiasm: &'static str,
    pub formality: &'static str,
    pub humor: &'static str,
}

/// Map personality keys to descriptions; unknown keys use each axis default.
pub fn describe_personality(personality: &Personality) -> PersonalityDescription {
    let tone = match personality.tone.as_str() {
        "strict" => "厳しく真面目",
        "friendly" => "フレンドリーで親しみやすい",
        "intellectual" => "知的で論理的",
        _ => "優しく温かい",
    };
    let enthusiasm = match personality.enthusiasm.as_str() {
        "high" => "熱意が高く積極的",
        "modest" => "控えめで冷静",
        _ => "程よく落ち着いている",
    };
    let formality = match personality.formality.as_str() {
        "casual" => "カジュアルで気さく",
        "formal" => "フォーマルで格式高い",
        _ => "丁寧で礼儀正しい",
    };
    let humor = match personality.humor.as_str() {
        "high" => "ユーモアがあり面白い",
        "low" => "機知に富んでいる",
        _ => "真面目で堅実",
    };

    PersonalityDescription {
        tone,
        enthusiasm,
        formality,
        humor,
    }
}

/// Ledger label of a generated comment.
pub fn usage_label(event_type: &str) -> String {
    format!("コメント生成（{event_type}）")
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

fn avatar_character(theme: Theme) -> &'static str {
    match theme {
        Theme::Child => "子どもを励まし応援するサポートアバター",
        Theme::Adult => "教師アバター",
    }
}

/// Build the chat prompt asking for a short comment for `event_type`.
pub fn build_comment_prompt(profile: &CharacterProfile, event_type: &str) -> String {
    let desc = describe_personality(&profile.personality);

    let mut scene = scene_description(event_type).to_string();
    if profile.theme.is_child() {
        scene.push_str(CHILD_SCENE_SUFFIX);
    }

    format!(
        "あなたは以下の性格を持つ{character}です：\n\
         - 口調: {tone}\n\
         - 熱意: {enthusiasm}\n\
         - 丁寧さ: {formality}\n\
         - ユーモア: {humor}\n\
         \n\
         シチュエーション: {scene}\n\
         \n\
         この性格に合った、短い応援コメント（日本語、50文字以内）を1つだけ生成してください。\n\
         余計な説明や前置きは不要です。コメント本文のみを出力してください。",
        character = avatar_character(profile.theme),
        tone = desc.tone,
        enthusiasm = desc.enthusiasm,
        formality = desc.formality,
        humor = desc.humor,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
