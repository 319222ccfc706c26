//! Presence action keys and their transport-level chat actions.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PRESENCE_ACTION_KEY: &str = "typing";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates the presence kinds a chat transport can display.
pub enum PresenceAction {
    Typing,
    UploadPhoto,
    RecordVideo,
    UploadVideo,
    RecordVoice,
    UploadVoice,
    UploadDocument,
    ChooseSticker,
    FindLocation,
    RecordVideoNote,
    UploadVideoNote,
}

const PRESENCE_ACTIONS: [PresenceAction; 11] = [
    PresenceAction::Typing,
    PresenceAction::UploadPhoto,
    PresenceAction::RecordVideo,
    PresenceAction::UploadVideo,
    PresenceAction::RecordVoice,
    PresenceAction::UploadVoice,
    PresenceAction::UploadDocument,
    PresenceAction::ChooseSticker,
    PresenceAction::FindLocation,
    PresenceAction::RecordVideoNote,
    PresenceAction::UploadVideoNote,
];

impl PresenceAction {
    /// Short operator-facing key, e.g. `upload-photo`.
    pub fn key(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadPhoto => "upload-photo",
            Self::RecordVideo => "record-video",
            Self::UploadVideo => "upload-video",
            Self::RecordVoice => "record-voice",
            Self::UploadVoice => "upload-voice",
            Self::UploadDocument => "upload-document",
            Self::ChooseSticker => "choose-sticker",
            Self::FindLocation => "find-location",
            Self::RecordVideoNote => "record-video-note",
            Self::UploadVideoNote => "upload-video-note",
        }
    }

    /// Wire value expected by the Bot API `sendChatAction` method.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadPhoto => "upload_photo",
            Self::RecordVideo => "record_video",
            Self::UploadVideo => "upload_video",
            Self::RecordVoice => "record_voice",
            Self::UploadVoice => "upload_voice",
            Self::UploadDocument => "upload_document",
            Self::ChooseSticker => "choose_sticker",
            Self::FindLocation => "find_location",
            Self::RecordVideoNote => "record_video_note",
            Self::UploadVideoNote => "upload_video_note",
        }
    }

    /// Looks up a key, accepting either case and `_` in place of `-`.
    pub fn from_key(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        PRESENCE_ACTIONS
            .iter()
            .copied()
            .find(|action| action.key() == normalized)
    }
}

/// Resolves a mode key to a presence action. Unknown keys resolve to typing.
pub fn resolve_presence_action(key: &str) -> PresenceAction {
    PresenceAction::from_key(key).unwrap_or(PresenceAction::Typing)
}

/// Returns the canonical key for `raw`, replacing unknown input with the default key.
pub fn normalize_presence_action_key(raw: &str) -> &'static str {
    resolve_presence_action(raw).key()
}

/// Lists every supported action key in display order.
pub fn supported_presence_action_keys() -> Vec<&'static str> {
    PRESENCE_ACTIONS.iter().map(|action| action.key()).collect()
}
