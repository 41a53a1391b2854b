use mime::Mime;
use std::fmt;

/// Image containers whose leading bytes we know how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    WebP,
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    const ALL: [ImageFormat; 4] = [Self::WebP, Self::Jpeg, Self::Png, Self::Gif];

    /// Format implied by a media type; `None` for anything we don't sniff.
    pub fn from_mime(media: &Mime) -> Option<Self> {
        if media.type_() != mime::IMAGE {
            return None;
        }
        match media.subtype().as_str() {
            "webp" => Some(Self::WebP),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn magic(self) -> &'static [u8] {
        match self {
            Self::WebP => b"RIFF",
            Self::Jpeg => &[0xFF, 0xD8],
            Self::Png => &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
            Self::Gif => b"GIF",
        }
    }

    pub fn matches(self, bytes: &[u8]) -> bool {
        bytes.starts_with(self.magic())
    }

    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.matches(bytes))
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WebP => "WebP",
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
        })
    }
}

/// Decrypted bytes don't start with the signature the content type promises.
/// Advisory only: the response is still served as resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatMismatch {
    pub expected: ImageFormat,
    pub detected: Option<ImageFormat>,
}

impl fmt::Display for FormatMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detected {
            Some(detected) => write!(f, "expected {} data, found {}", self.expected, detected),
            None => write!(f, "expected {} data, found no known image signature", self.expected),
        }
    }
}

pub fn check_signature(content_type: &Mime, plaintext: &[u8]) -> Option<FormatMismatch> {
    let expected = ImageFormat::from_mime(content_type)?;
    if expected.matches(plaintext) {
        return None;
    }
    Some(FormatMismatch {
        expected,
        detected: ImageFormat::sniff(plaintext),
    })
}
