//! Content classifier
//!
//! Determines a MIME-like type/subtype from an entry's leading bytes.
//! Entry names are never consulted: archive entry names are untrusted and
//! often disagree with the content.

use std::fmt;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// MIME-like content type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType {
    pub media_type: String,
    pub subtype: String,
}

impl ContentType {
    const UNKNOWN: &'static str = "unknown";

    pub fn new(media_type: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            subtype: subtype.into(),
        }
    }

    /// Outcome for signatures no matcher recognises
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN, Self::UNKNOWN)
    }

    pub fn is_unknown(&self) -> bool {
        self.media_type == Self::UNKNOWN
    }

    /// Parse "type/subtype"
    pub fn from_mime(mime: &str) -> Self {
        match mime.split_once('/') {
            Some((media_type, subtype)) if !media_type.is_empty() && !subtype.is_empty() => {
                Self::new(media_type.to_ascii_lowercase(), subtype.to_ascii_lowercase())
            }
            _ => Self::unknown(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type == "image"
    }

    pub fn is_xml(&self) -> bool {
        self.subtype == "xml"
    }

    /// Preferred file extension, used when a renamed entry needs one
    pub fn extension(&self) -> Option<&str> {
        match (self.media_type.as_str(), self.subtype.as_str()) {
            ("image", "jpeg") => Some("jpg"),
            ("image", "png") => Some("png"),
            ("image", "gif") => Some("gif"),
            ("image", "webp") => Some("webp"),
            ("image", "bmp") => Some("bmp"),
            ("image", "avif") => Some("avif"),
            (_, "xml") => Some("xml"),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.subtype)
    }
}

/// Byte-signature classifier
///
/// Deterministic and side-effect free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentClassifier;

impl ContentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, bytes: &[u8]) -> ContentType {
        if let Some(kind) = infer::get(bytes) {
            return ContentType::from_mime(kind.mime_type());
        }

        if looks_like_xml(bytes) {
            return ContentType::new("text", "xml");
        }

        ContentType::unknown()
    }
}

/// XML declaration or a root element after an optional BOM and whitespace
fn looks_like_xml(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());

    match &bytes[start..] {
        [b'<', b'?', b'x', b'm', b'l', ..] => true,
        [b'<', first, ..] => first.is_ascii_alphabetic(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(bytes: &[u8]) -> ContentType {
        ContentClassifier::new().classify(bytes)
    }

    #[test]
    fn test_jpeg_signature() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
        assert_eq!(classify(&bytes), ContentType::new("image", "jpeg"));
    }

    #[test]
    fn test_png_signature() {
        let bytes = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        assert_eq!(classify(&bytes), ContentType::new("image", "png"));
    }

    #[test]
    fn test_gif_signature() {
        assert_eq!(classify(b"GIF89a\x01\x00\x01\x00"), ContentType::new("image", "gif"));
    }

    #[test]
    fn test_xml_with_bom_and_whitespace() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"\n  <?xml version=\"1.0\"?><ComicInfo/>");
        assert!(classify(&bytes).is_xml());
    }

    #[test]
    fn test_bare_root_element_is_xml() {
        assert!(classify(b"<ComicInfo><Series>X</Series></ComicInfo>").is_xml());
    }

    #[test]
    fn test_unknown_is_not_an_error() {
        let result = classify(b"just some text");
        assert!(result.is_unknown());
        assert!(classify(&[]).is_unknown());
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(ContentType::from_mime("Image/JPEG"), ContentType::new("image", "jpeg"));
        assert!(ContentType::from_mime("garbage").is_unknown());
        assert_eq!(ContentType::new("image", "jpeg").extension(), Some("jpg"));
    }
}
