//! Builtin catalog of Vietnamese Google Cloud voices and playback speeds.

use serde::{Deserialize, Serialize};

/// Voice used when a request does not name one.
pub const DEFAULT_VOICE: &str = "vi-VN-Neural2-A";

/// Sentence spoken when previewing a voice, always at speed 1.
pub const PREVIEW_TEXT: &str = "Xin chào, tôi là trợ lý ảo của bạn.";

/// Selectable playback speeds, slowest to fastest.
pub const SPEED_STEPS: [f32; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub gender: Gender,
}

/// The six Vietnamese voices the synthesizer supports, Neural2 first.
pub fn builtin_voices() -> &'static [VoiceProfile] {
    &[
        VoiceProfile { id: "vi-VN-Neural2-A", name: "Neural2-A - Nữ (Khuyến nghị)", gender: Gender::Female },
        VoiceProfile { id: "vi-VN-Neural2-D", name: "Neural2-D - Nam (Khuyến nghị)", gender: Gender::Male },
        VoiceProfile { id: "vi-VN-Wavenet-A", name: "Wavenet-A - Nữ", gender: Gender::Female },
        VoiceProfile { id: "vi-VN-Wavenet-B", name: "Wavenet-B - Nam", gender: Gender::Male },
        VoiceProfile { id: "vi-VN-Wavenet-C", name: "Wavenet-C - Nữ (Trẻ)", gender: Gender::Female },
        VoiceProfile { id: "vi-VN-Wavenet-D", name: "Wavenet-D - Nam (Trẻ)", gender: Gender::Male },
    ]
}

/// Look up a voice by id.
pub fn find(id: &str) -> Option<&'static VoiceProfile> {
    builtin_voices().iter().find(|v| v.id == id)
}

/// Next faster speed step, or the current speed when already at the top.
pub fn faster(current: f32) -> f32 {
    match SPEED_STEPS.iter().position(|s| *s == current) {
        Some(i) if i + 1 < SPEED_STEPS.len() => SPEED_STEPS[i + 1],
        _ => current,
    }
}

/// Next slower speed step, or the current speed when already at the bottom.
pub fn slower(current: f32) -> f32 {
    match SPEED_STEPS.iter().position(|s| *s == current) {
        Some(i) if i > 0 => SPEED_STEPS[i - 1],
        _ => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_six_voices_and_a_valid_default() {
        assert_eq!(builtin_voices().len(), 6);
        assert!(find(DEFAULT_VOICE).is_some());
        assert_eq!(find(DEFAULT_VOICE).map(|v| v.gender), Some(Gender::Female));
    }

    #[test]
    fn find_rejects_unknown_ids() {
        assert!(find("en-US-Neural2-A").is_none());
    }

    #[test]
    fn speed_steps_clamp_at_both_ends() {
        assert_eq!(faster(1.0), 1.25);
        assert_eq!(slower(1.0), 0.75);
        assert_eq!(faster(2.0), 2.0, "top speed stays put");
        assert_eq!(slower(0.5), 0.5, "bottom speed stays put");
        assert_eq!(faster(0.9), 0.9, "off-step speeds are left alone");
    }

    #[test]
    fn genders_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"male\"");
    }
}
