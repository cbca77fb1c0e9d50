//! MIME type classification for uploads.

use stealth_entity::message::MediaKind;

/// MIME type, the media kind it maps to, and the file extensions allowed
/// for it. The first extension is the default.
type Accepted = (&'static str, MediaKind, &'static [&'static str]);

const ACCEPTED: &[Accepted] = &[
    ("image/jpeg", MediaKind::Image, &["jpg", "jpeg"]),
    ("image/png", MediaKind::Image, &["png"]),
    ("image/gif", MediaKind::Image, &["gif"]),
    ("image/webp", MediaKind::Image, &["webp"]),
    ("video/mp4", MediaKind::Video, &["mp4", "m4v"]),
    ("video/webm", MediaKind::Video, &["webm"]),
    ("video/ogg", MediaKind::Video, &["ogv", "ogg"]),
    ("audio/mp3", MediaKind::Audio, &["mp3"]),
    ("audio/mpeg", MediaKind::Audio, &["mp3", "mpga"]),
    ("audio/wav", MediaKind::Audio, &["wav"]),
    ("audio/ogg", MediaKind::Audio, &["ogg", "oga", "opus"]),
    ("audio/webm", MediaKind::Audio, &["webm", "weba"]),
    ("application/pdf", MediaKind::Document, &["pdf"]),
    ("text/plain", MediaKind::Document, &["txt"]),
    ("application/msword", MediaKind::Document, &["doc"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        MediaKind::Document,
        &["docx"],
    ),
];

/// Strip parameters (`; codecs=opus`) and normalize case.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn lookup(content_type: &str) -> Option<&'static Accepted> {
    let essence = essence(content_type);
    ACCEPTED.iter().find(|(mime, _, _)| *mime == essence)
}

/// Classify a MIME type. `None` if the type is not accepted.
pub fn classify_mime(content_type: &str) -> Option<MediaKind> {
    lookup(content_type).map(|(_, kind, _)| *kind)
}

/// Extension to store an upload under.
///
/// The client's extension is kept only when it is one the declared MIME
/// type allows; anything else gets the type's default. The result never
/// disagrees with the validated content type.
pub fn stored_extension(content_type: &str, file_name: Option<&str>) -> Option<&'static str> {
    let (_, _, allowed) = lookup(content_type)?;
    let requested = file_name.and_then(sanitize_extension);
    requested
        .and_then(|ext| allowed.iter().find(|a| **a == ext).copied())
        .or_else(|| allowed.first().copied())
}

/// Extract a safe extension from a client-supplied file name.
///
/// Only ASCII alphanumerics survive, lowercased, at most 10 characters.
fn sanitize_extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let clean: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    (!clean.is_empty()).then_some(clean)
}
