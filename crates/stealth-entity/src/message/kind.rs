//! Message type and media kind enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use stealth_core::AppError;

/// The declared type of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain text body.
    Text,
    /// Image attachment.
    Image,
    /// Video attachment.
    Video,
    /// Audio file attachment.
    Audio,
    /// Document attachment.
    Document,
    /// Recorded voice note. Stored as audio media.
    Voice,
}

impl MessageType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Voice => "voice",
        }
    }

    /// The media kind an attachment of this type must carry.
    ///
    /// `None` for text messages, which never carry an attachment.
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            Self::Text => None,
            Self::Image => Some(MediaKind::Image),
            Self::Video => Some(MediaKind::Video),
            Self::Audio | Self::Voice => Some(MediaKind::Audio),
            Self::Document => Some(MediaKind::Document),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "document" => Ok(Self::Document),
            "voice" => Ok(Self::Voice),
            _ => Err(AppError::validation(format!(
                "Invalid message type: '{s}'. Expected one of: text, image, video, audio, document, voice"
            ))),
        }
    }
}

/// The kind of media an attachment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
    /// Audio clip or voice note.
    Audio,
    /// Any other document.
    Document,
}

impl MediaKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "document" => Ok(Self::Document),
            _ => Err(AppError::validation(format!(
                "Invalid media kind: '{s}'. Expected one of: image, video, audio, document"
            ))),
        }
    }
}
