//! Image prompt composition for avatar generation.
//!
//! [`build_base_prompt`] describes the character; [`build_full_prompt`]
//! wraps it with the expression, solo guards, pose, quality tags and
//! background for one cell. Segment order is significant: the
//! expression comes first so it receives the most model attention.

use crate::profile::CharacterProfile;

// ---------------------------------------------------------------------------
// Fixed prompt blocks
// ---------------------------------------------------------------------------

/// Guards against multiple characters in one image.
const SOLO_GUARDS: &[&str] = &["1person", "solo", "single character only"];

/// Quality tags appended after the pose.
const QUALITY_TAGS: &[&str] = &[
    "high quality",
    "masterpiece",
    "best quality",
    "(detailed face:1.2)",
    "(clear facial features:1.2)",
    "sharp focus",
    "professional illustration",
];

/// Plain background so background removal has an easy job.
const BACKGROUND_TAGS: &[&str] = &["plain white background", "simple background", "studio lighting"];

/// Extra traits for child-theme supporters.
const CHILD_ENCOURAGEMENT: &str =
    "bright sparkling eyes, cheerful energetic atmosphere, friendly encouraging smile";

/// Deformation block for chibi characters.
const CHIBI_TRAITS: &str = "chibi character, cute deformed proportions, super deformed style, \
                            kawaii small body, big head ratio 1:3, simplified features, \
                            adorable tiny hands and feet";

/// Fallback noun when `sex` is not a known option.
const UNKNOWN_SEX: &str = "person";

// ---------------------------------------------------------------------------
// Appearance lookups
// ---------------------------------------------------------------------------

fn sex_phrase(value: &str) -> &'static str {
    match value {
        "male" => "male",
        "female" => "female",
        "other" => "androgynous",
        _ => UNKNOWN_SEX,
    }
}

fn hair_style_phrase(value: &str) -> Option<&'static str> {
    match value {
        "short" => Some("short hair"),
        "middle" => Some("medium hair"),
        "long" => Some("long hair"),
        _ => None,
    }
}

fn hair_color_phrase(value: &str) -> Option<&'static str> {
    match value {
        "black" => Some("black hair"),
        "brown" => Some("brown hair"),
        "blonde" => Some("blonde hair"),
        "silver" => Some("silver hair"),
        "red" => Some("red hair"),
        _ => None,
    }
}

fn eye_color_phrase(value: &str) -> Option<&'static str> {
    match value {
        "brown" => Some("brown eyes"),
        "blue" => Some("blue eyes"),
        "green" => Some("green eyes"),
        "gray" => Some("gray eyes"),
        "purple" => Some("purple eyes"),
        _ => None,
    }
}

fn clothing_phrase(value: &str) -> Option<&'static str> {
    match value {
        "suit" => Some("wearing professional business suit"),
        "casual" => Some("wearing casual clothes"),
        "kimono" => Some("wearing traditional kimono"),
        "robe" => Some("wearing academic robe"),
        "dress" => Some("wearing elegant dress"),
        _ => None,
    }
}

fn accessory_phrase(value: &str) -> Option<&'static str> {
    match value {
        "glasses" => Some("wearing glasses"),
        "hat" => Some("wearing hat"),
        "tie" => Some("wearing necktie"),
        _ => None,
    }
}

fn body_type_phrase(value: &str) -> Option<&'static str> {
    match value {
        "average" => Some("average build"),
        "slim" => Some("slim build"),
        "sturdy" => Some("sturdy build"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Join non-empty segments with `", "`.
fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Describe the character independently of pose and expression.
///
/// Unknown appearance values contribute nothing, except `sex`, which
/// falls back to `"person"`.
pub fn build_base_prompt(profile: &CharacterProfile) -> String {
    let identity = format!(
        "anime style {} character ID {}",
        profile.theme.role_noun(),
        profile.seed
    );

    let appearance = [
        Some(sex_phrase(&profile.sex)),
        hair_style_phrase(&profile.hair_style),
        hair_color_phrase(&profile.hair_color),
        eye_color_phrase(&profile.eye_color),
        clothing_phrase(&profile.clothing),
        profile.accessory.as_deref().and_then(accessory_phrase),
        body_type_phrase(&profile.body_type),
    ];

    let mut segments: Vec<&str> = vec![
        "1person",
        "solo character",
        identity.as_str(),
        "clothing colors that harmonize with hair color",
    ];
    segments.extend(appearance.into_iter().flatten());
    if profile.theme.is_child() {
        segments.push(CHILD_ENCOURAGEMENT);
    }
    if profile.is_chibi {
        segments.push(CHIBI_TRAITS);
    }

    join_segments(segments)
}

/// Assemble the prompt for one (pose, expression) cell.
pub fn build_full_prompt(base_prompt: &str, pose_description: &str, expression_prompt: &str) -> String {
    let mut segments: Vec<&str> = Vec::with_capacity(16);
    segments.push(expression_prompt);
    segments.extend_from_slice(SOLO_GUARDS);
    segments.push(base_prompt);
    segments.push(pose_description);
    segments.extend_from_slice(QUALITY_TAGS);
    segments.extend_from_slice(BACKGROUND_TAGS);
    join_segments(segments)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Theme;

    fn profile() -> CharacterProfile {
        CharacterProfile {
            sex: "female".into(),
            hair_style: "long".into(),
            hair_color: "silver".into(),
            eye_color: "blue".into(),
            clothing: "suit".into(),
            accessory: Some("glasses".into()),
            body_type: "slim".into(),
            seed: 424242,
            ..Default::default()
        }
    }

    #[test]
    fn base_prompt_includes_role_and_seed() {
        let prompt = build_base_prompt(&profile());
        assert!(prompt.starts_with("1person, solo character, anime style teacher character ID 424242"));
    }

    #[test]
    fn base_prompt_maps_appearance() {
        let prompt = build_base_prompt(&profile());
        for phrase in [
            "female",
            "long hair",
            "silver hair",
            "blue eyes",
            "wearing professional business suit",
            "wearing glasses",
            "slim build",
        ] {
            assert!(prompt.contains(phrase), "missing '{phrase}' in {prompt}");
        }
    }

    #[test]
    fn unknown_sex_falls_back_to_person() {
        let mut p = profile();
        p.sex = "robot".into();
        let prompt = build_base_prompt(&p);
        assert!(prompt.contains("character ID 424242, clothing colors that harmonize with hair color, person, long hair"));
    }

    #[test]
    fn unknown_attributes_are_dropped_without_gaps() {
        let mut p = profile();
        p.hair_color = "rainbow".into();
        p.accessory = Some(String::new());
        p.clothing = String::new();
        let prompt = build_base_prompt(&p);
        assert!(!prompt.contains(", ,"));
        assert!(prompt.contains("long hair, blue eyes, slim build"));
    }

    #[test]
    fn child_theme_uses_supporter_and_encouragement() {
        let mut p = profile();
        p.theme = Theme::Child;
        let prompt = build_base_prompt(&p);
        assert!(prompt.contains("anime style supporter character ID"));
        assert!(prompt.contains(CHILD_ENCOURAGEMENT));
    }

    #[test]
    fn adult_theme_has_no_encouragement() {
        assert!(!build_base_prompt(&profile()).contains("friendly encouraging smile"));
    }

    #[test]
    fn chibi_block_only_for_chibi() {
        let mut p = profile();
        assert!(!build_base_prompt(&p).contains("chibi character"));
        p.is_chibi = true;
        assert!(build_base_prompt(&p).ends_with("adorable tiny hands and feet"));
    }

    #[test]
    fn full_prompt_orders_segments() {
        let full = build_full_prompt("BASE", "POSE", "(happy expression:1.3)");
        assert!(full.starts_with("(happy expression:1.3), 1person, solo, single character only, BASE, POSE, high quality"));
        assert!(full.ends_with("plain white background, simple background, studio lighting"));
    }

    #[test]
    fn full_prompt_omits_empty_segments() {
        let full = build_full_prompt("BASE", "", "");
        assert!(full.starts_with("1person, solo"));
        assert!(full.contains("BASE, high quality"));
        assert!(!full.contains(", ,"));
    }
}
