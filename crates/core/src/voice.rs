//! Voice catalog
//!
//! Single source of truth for the allowed synthesis voices. The catalog is
//! the Neural voice table; the legacy Twilio-style voice names are not
//! accepted anywhere in the runtime.

use once_cell::sync::Lazy;
use serde::Serialize;

/// Default synthesis voice
pub const DEFAULT_VOICE: &str = "en-GB-SoniaNeural";
/// Default synthesis language
pub const DEFAULT_LANGUAGE: &str = "en-GB";

/// One catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct VoiceInfo {
    /// Display name
    pub name: &'static str,
    /// Engine voice identifier
    pub short_name: &'static str,
    pub gender: &'static str,
    pub locale: &'static str,
}

static CATALOG: Lazy<Vec<VoiceInfo>> = Lazy::new(|| {
    vec![
        VoiceInfo {
            name: "English (GB) – Female",
            short_name: "en-GB-SoniaNeural",
            gender: "Female",
            locale: "en-GB",
        },
        VoiceInfo {
            name: "English (GB) – Male",
            short_name: "en-GB-RyanNeural",
            gender: "Male",
            locale: "en-GB",
        },
        VoiceInfo {
            name: "English (GB) – Female",
            short_name: "en-GB-LibbyNeural",
            gender: "Female",
            locale: "en-GB",
        },
        VoiceInfo {
            name: "English (GB) – Male",
            short_name: "en-GB-ThomasNeural",
            gender: "Male",
            locale: "en-GB",
        },
        VoiceInfo {
            name: "Tamil – Female",
            short_name: "ta-IN-PallaviNeural",
            gender: "Female",
            locale: "ta-IN",
        },
        VoiceInfo {
            name: "Tamil – Male",
            short_name: "ta-IN-ValluvarNeural",
            gender: "Male",
            locale: "ta-IN",
        },
        VoiceInfo {
            name: "Hindi – Female",
            short_name: "hi-IN-SwaraNeural",
            gender: "Female",
            locale: "hi-IN",
        },
        VoiceInfo {
            name: "Hindi – Male",
            short_name: "hi-IN-MadhurNeural",
            gender: "Male",
            locale: "hi-IN",
        },
    ]
});

/// Full catalog
pub fn voice_catalog() -> &'static [VoiceInfo] {
    &CATALOG
}

/// Check whether a voice id is in the catalog
pub fn is_allowed_voice(voice_id: &str) -> bool {
    CATALOG.iter().any(|v| v.short_name == voice_id)
}

/// Check whether a language has catalog voices
pub fn is_allowed_language(language: &str) -> bool {
    CATALOG.iter().any(|v| v.locale == language)
}

/// Catalog entries for one locale prefix (e.g. "en" or "en-GB")
pub fn voices_for_language(language: &str) -> Vec<&'static VoiceInfo> {
    CATALOG
        .iter()
        .filter(|v| v.locale.starts_with(language))
        .collect()
}

/// Error message listing the allowed voices
pub fn voice_validation_error() -> String {
    let mut allowed: Vec<&str> = CATALOG.iter().map(|v| v.short_name).collect();
    allowed.sort_unstable();
    format!("Voice must be one of: {}", allowed.join(", "))
}
