//! Category policy table
//!
//! Static configuration describing, for every [`FileCategory`], which
//! extensions and declared content types are accepted, how large a file may
//! be, and which binary signatures ("magic numbers") confirm the content.
//!
//! The table is built once at start-up and shared read-only. Extension and
//! content-type sets are disjoint across categories so a filename or a
//! declared type maps to at most one category.

use crate::models::FileCategory;

const MIB: u64 = 1024 * 1024;

pub const DEFAULT_MAX_AUDIO_SIZE: u64 = 500 * MIB;
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 20 * MIB;
pub const DEFAULT_MAX_VIDEO_SIZE: u64 = 2048 * MIB;
pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = 50 * MIB;

/// Fixed byte pattern expected at a known offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRule {
    pub offset: usize,
    pub expected: &'static [u8],
}

impl SignatureRule {
    pub const fn new(offset: usize, expected: &'static [u8]) -> Self {
        Self { offset, expected }
    }

    /// True if `bytes[offset..offset + expected.len()] == expected`.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        let end = self.offset + self.expected.len();
        bytes.len() >= end && &bytes[self.offset..end] == self.expected
    }

    /// Number of leading bytes needed to evaluate this rule.
    pub fn span(&self) -> usize {
        self.offset + self.expected.len()
    }
}

/// Upload policy for a single category.
#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    pub category: FileCategory,
    /// Lowercase, without leading dot.
    pub extensions: Vec<String>,
    /// Lowercase MIME types without parameters.
    pub content_types: Vec<String>,
    pub max_size: u64,
    pub signatures: Vec<SignatureRule>,
}

impl CategoryPolicy {
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.extensions.iter().any(|e| *e == extension)
    }

    pub fn allows_content_type(&self, content_type: &str) -> bool {
        let content_type = content_type.to_lowercase();
        self.content_types.iter().any(|ct| *ct == content_type)
    }

    /// A category matches if any of its rules match.
    pub fn signature_matches(&self, bytes: &[u8]) -> bool {
        self.signatures.iter().any(|rule| rule.matches(bytes))
    }
}

/// Immutable policy table, one [`CategoryPolicy`] per [`FileCategory`].
#[derive(Debug, Clone)]
pub struct PolicyTable {
    audio: CategoryPolicy,
    image: CategoryPolicy,
    video: CategoryPolicy,
    document: CategoryPolicy,
}

/// Per-category size ceilings in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub audio: u64,
    pub image: u64,
    pub video: u64,
    pub document: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            audio: DEFAULT_MAX_AUDIO_SIZE,
            image: DEFAULT_MAX_IMAGE_SIZE,
            video: DEFAULT_MAX_VIDEO_SIZE,
            document: DEFAULT_MAX_DOCUMENT_SIZE,
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl PolicyTable {
    /// Table with the default size ceilings.
    pub fn new() -> Self {
        Self::with_limits(SizeLimits::default())
    }

    pub fn with_limits(limits: SizeLimits) -> Self {
        Self {
            audio: CategoryPolicy {
                category: FileCategory::Audio,
                extensions: owned(&["mp3", "wav", "ogg", "m4a", "aac", "flac"]),
                content_types: owned(&[
                    "audio/mpeg",
                    "audio/mp3",
                    "audio/wav",
                    "audio/wave",
                    "audio/x-wav",
                    "audio/ogg",
                    "audio/mp4",
                    "audio/x-m4a",
                    "audio/aac",
                    "audio/flac",
                    "audio/x-flac",
                ]),
                max_size: limits.audio,
                signatures: vec![
                    // MP3 with ID3v2 tag
                    SignatureRule::new(0, b"ID3"),
                    // MP3 bare MPEG-1 Layer III frame sync
                    SignatureRule::new(0, &[0xFF, 0xFB]),
                    // WAV: RIFF container with the WAVE form type
                    SignatureRule::new(8, b"WAVE"),
                    // Ogg container
                    SignatureRule::new(0, b"OggS"),
                    // FLAC
                    SignatureRule::new(0, b"fLaC"),
                    // ISO base media with an audio-only brand
                    SignatureRule::new(4, b"ftypM4A "),
                    SignatureRule::new(4, b"ftypM4B "),
                    // AAC ADTS
                    SignatureRule::new(0, &[0xFF, 0xF1]),
                ],
            },
            image: CategoryPolicy {
                category: FileCategory::Image,
                extensions: owned(&["jpg", "jpeg", "png", "gif", "webp"]),
                content_types: owned(&["image/jpeg", "image/png", "image/gif", "image/webp"]),
                max_size: limits.image,
                signatures: vec![
                    SignatureRule::new(0, &[0xFF, 0xD8, 0xFF]),
                    SignatureRule::new(0, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
                    SignatureRule::new(0, b"GIF8"),
                    SignatureRule::new(8, b"WEBP"),
                ],
            },
            video: CategoryPolicy {
                category: FileCategory::Video,
                extensions: owned(&["mp4", "m4v", "mov", "webm", "mkv", "avi"]),
                content_types: owned(&[
                    "video/mp4",
                    "video/x-m4v",
                    "video/quicktime",
                    "video/webm",
                    "video/x-matroska",
                    "video/x-msvideo",
                ]),
                max_size: limits.video,
                signatures: vec![
                    // ISO base media, major brand decides audio vs video
                    SignatureRule::new(4, b"ftypisom"),
                    SignatureRule::new(4, b"ftypiso2"),
                    SignatureRule::new(4, b"ftypiso5"),
                    SignatureRule::new(4, b"ftypmp41"),
                    SignatureRule::new(4, b"ftypmp42"),
                    SignatureRule::new(4, b"ftypavc1"),
                    SignatureRule::new(4, b"ftypdash"),
                    SignatureRule::new(4, b"ftypM4V "),
                    SignatureRule::new(4, b"ftypqt  "),
                    // Older QuickTime files start with the movie atom
                    SignatureRule::new(4, b"moov"),
                    // EBML header (WebM, Matroska)
                    SignatureRule::new(0, &[0x1A, 0x45, 0xDF, 0xA3]),
                    SignatureRule::new(8, b"AVI "),
                ],
            },
            document: CategoryPolicy {
                category: FileCategory::Document,
                extensions: owned(&["pdf", "doc", "docx"]),
                content_types: owned(&[
                    "application/pdf",
                    "application/msword",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                ]),
                max_size: limits.document,
                signatures: vec![
                    SignatureRule::new(0, b"%PDF"),
                    // OLE2 compound file (legacy .doc)
                    SignatureRule::new(0, &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
                    // ZIP (.docx)
                    SignatureRule::new(0, &[0x50, 0x4B, 0x03, 0x04]),
                ],
            },
        }
    }

    pub fn policy(&self, category: FileCategory) -> &CategoryPolicy {
        match category {
            FileCategory::Audio => &self.audio,
            FileCategory::Image => &self.image,
            FileCategory::Video => &self.video,
            FileCategory::Document => &self.document,
        }
    }

    pub fn policies(&self) -> impl Iterator<Item = &CategoryPolicy> {
        FileCategory::ALL.into_iter().map(|c| self.policy(c))
    }

    pub fn category_for_extension(&self, extension: &str) -> Option<FileCategory> {
        self.policies()
            .find(|p| p.allows_extension(extension))
            .map(|p| p.category)
    }

    pub fn category_for_content_type(&self, content_type: &str) -> Option<FileCategory> {
        self.policies()
            .find(|p| p.allows_content_type(content_type))
            .map(|p| p.category)
    }

    /// Every allowed extension across all categories, in table order.
    pub fn all_extensions(&self) -> Vec<String> {
        self.policies()
            .flat_map(|p| p.extensions.iter().cloned())
            .collect()
    }

    /// Leading bytes needed to evaluate every signature rule in the table.
    pub fn probe_len(&self) -> usize {
        self.policies()
            .flat_map(|p| p.signatures.iter().map(SignatureRule::span))
            .max()
            .unwrap_or(0)
    }

    /// Largest ceiling of any category.
    pub fn max_size_overall(&self) -> u64 {
        self.policies().map(|p| p.max_size).max().unwrap_or(0)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_signature_rule_offset() {
        let rule = SignatureRule::new(4, b"ftyp");
        assert!(rule.matches(b"\x00\x00\x00\x18ftypisom"));
        assert!(!rule.matches(b"ftyp"));
        assert!(!rule.matches(b"\x00\x00\x00"));
    }

    #[test]
    fn test_extensions_and_content_types_are_disjoint() {
        let table = PolicyTable::new();
        let mut extensions = HashSet::new();
        let mut content_types = HashSet::new();
        for policy in table.policies() {
            for ext in &policy.extensions {
                assert!(extensions.insert(ext.clone()), "duplicate extension {}", ext);
            }
            for ct in &policy.content_types {
                assert!(content_types.insert(ct.clone()), "duplicate type {}", ct);
            }
        }
    }

    #[test]
    fn test_category_lookup_case_insensitive() {
        let table = PolicyTable::new();
        assert_eq!(table.category_for_extension("MP3"), Some(FileCategory::Audio));
        assert_eq!(
            table.category_for_content_type("Image/PNG"),
            Some(FileCategory::Image)
        );
        assert_eq!(table.category_for_extension("exe"), None);
    }

    #[test]
    fn test_audio_has_multiple_signatures() {
        let table = PolicyTable::new();
        let audio = table.policy(FileCategory::Audio);
        assert!(audio.signature_matches(b"ID3\x04\x00"));
        assert!(audio.signature_matches(b"OggS\x00\x02"));
        assert!(audio.signature_matches(b"fLaC\x00\x00"));
        assert!(!audio.signature_matches(b"hello world"));
    }

    #[test]
    fn test_shared_containers_split_by_form_type() {
        let table = PolicyTable::new();
        let audio = table.policy(FileCategory::Audio);
        let video = table.policy(FileCategory::Video);

        let wav = b"RIFF\x24\x08\x00\x00WAVEfmt ";
        let avi = b"RIFF\x24\x08\x00\x00AVI LIST";
        let m4a = b"\x00\x00\x00\x20ftypM4A \x00\x00";
        let mp4 = b"\x00\x00\x00\x20ftypisom\x00\x00";

        assert!(audio.signature_matches(wav) && !video.signature_matches(wav));
        assert!(video.signature_matches(avi) && !audio.signature_matches(avi));
        assert!(audio.signature_matches(m4a) && !video.signature_matches(m4a));
        assert!(video.signature_matches(mp4) && !audio.signature_matches(mp4));
    }

    #[test]
    fn test_probe_len_covers_offset_rules() {
        let table = PolicyTable::new();
        // WEBP, WAVE, AVI and ftyp-brand rules end at byte 12
        assert_eq!(table.probe_len(), 12);
    }

    #[test]
    fn test_custom_limits() {
        let table = PolicyTable::with_limits(SizeLimits {
            image: 1024,
            ..SizeLimits::default()
        });
        assert_eq!(table.policy(FileCategory::Image).max_size, 1024);
        assert_eq!(table.max_size_overall(), DEFAULT_MAX_VIDEO_SIZE);
    }
}
