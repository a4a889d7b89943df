//! Content validation
//!
//! Classifies an upload by cross-checking three independently forgeable
//! signals: the filename extension, the declared content type, and the binary
//! signature of the bytes. Only the byte length and signature are computed
//! server-side; the other two are untrusted hints.
//!
//! Validation never stops at the first problem. Every violated rule is
//! collected so a client can fix everything in one round trip.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::FileCategory;
use crate::policy::PolicyTable;

/// A single violated upload rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("File is empty")]
    EmptyFile,

    #[error("Expected a {expected} file (allowed extensions: {})", join_list(.allowed_extensions))]
    CategoryMismatch {
        expected: FileCategory,
        allowed_extensions: Vec<String>,
    },

    #[error("Unrecognized file type (allowed extensions: {})", join_list(.allowed_extensions))]
    UnrecognizedFileType { allowed_extensions: Vec<String> },

    #[error("Invalid file extension '{extension}' for {category} (allowed: {})", join_list(.allowed))]
    InvalidExtension {
        category: FileCategory,
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type '{content_type}' for {category} (allowed: {})", join_list(.allowed))]
    InvalidContentType {
        category: FileCategory,
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {} (max: {})", human_size(.size), human_size(.max))]
    FileTooLarge { size: u64, max: u64 },

    #[error("File content does not match any known {category} signature")]
    SignatureMismatch { category: FileCategory },
}

impl ValidationIssue {
    /// Machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationIssue::EmptyFile => "EMPTY_FILE",
            ValidationIssue::CategoryMismatch { .. } => "CATEGORY_MISMATCH",
            ValidationIssue::UnrecognizedFileType { .. } => "UNRECOGNIZED_FILE_TYPE",
            ValidationIssue::InvalidExtension { .. } => "INVALID_EXTENSION",
            ValidationIssue::InvalidContentType { .. } => "INVALID_CONTENT_TYPE",
            ValidationIssue::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ValidationIssue::SignatureMismatch { .. } => "SIGNATURE_MISMATCH",
        }
    }
}

/// Serializable view of an issue for API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueSummary {
    pub code: String,
    pub message: String,
}

impl From<&ValidationIssue> for IssueSummary {
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            code: issue.code().to_string(),
            message: issue.to_string(),
        }
    }
}

/// Aggregate validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailed {
    pub category: Option<FileCategory>,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationFailed {
    pub fn has(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code() == code)
    }

    pub fn summaries(&self) -> Vec<IssueSummary> {
        self.errors.iter().map(IssueSummary::from).collect()
    }
}

impl std::fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationFailed {}

fn join_list(values: &[String]) -> String {
    values.join(", ")
}

fn human_size(bytes: &u64) -> String {
    format_size(*bytes)
}

/// Format a byte count for humans, e.g. `20.0 MiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

/// Strip parameters and normalize case: `"Image/JPEG; charset=x"` -> `"image/jpeg"`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Lowercased extension of the final path component, if it has one.
pub fn file_extension(filename: &str) -> Option<String> {
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Validator bound to an immutable policy table.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    policies: Arc<PolicyTable>,
}

impl ContentValidator {
    pub fn new(policies: Arc<PolicyTable>) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Validate a fully buffered payload.
    pub fn validate(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
        expected: Option<FileCategory>,
    ) -> Result<FileCategory, ValidationFailed> {
        self.validate_parts(bytes, bytes.len() as u64, filename, content_type, expected)
    }

    /// Validate using only the leading bytes of a payload and its measured size.
    ///
    /// `head` must hold at least [`PolicyTable::probe_len`] bytes when the
    /// payload is that long, or signature rules may fail to match.
    pub fn validate_parts(
        &self,
        head: &[u8],
        byte_count: u64,
        filename: &str,
        content_type: &str,
        expected: Option<FileCategory>,
    ) -> Result<FileCategory, ValidationFailed> {
        if byte_count == 0 {
            return Err(ValidationFailed {
                category: None,
                errors: vec![ValidationIssue::EmptyFile],
            });
        }

        let extension = file_extension(filename).unwrap_or_default();
        let content_type = normalize_content_type(content_type);

        let by_extension = self.policies.category_for_extension(&extension);
        let by_content_type = self.policies.category_for_content_type(&content_type);

        let mut errors = Vec::new();

        if let Some(expected) = expected {
            if by_extension != Some(expected) && by_content_type != Some(expected) {
                errors.push(ValidationIssue::CategoryMismatch {
                    expected,
                    allowed_extensions: self.policies.policy(expected).extensions.clone(),
                });
            }
        }

        let Some(category) = by_extension.or(by_content_type) else {
            errors.push(ValidationIssue::UnrecognizedFileType {
                allowed_extensions: self.policies.all_extensions(),
            });
            return Err(ValidationFailed {
                category: None,
                errors,
            });
        };

        let policy = self.policies.policy(category);

        if !policy.allows_extension(&extension) {
            errors.push(ValidationIssue::InvalidExtension {
                category,
                extension,
                allowed: policy.extensions.clone(),
            });
        }

        if !policy.allows_content_type(&content_type) {
            errors.push(ValidationIssue::InvalidContentType {
                category,
                content_type,
                allowed: policy.content_types.clone(),
            });
        }

        if byte_count > policy.max_size {
            errors.push(ValidationIssue::FileTooLarge {
                size: byte_count,
                max: policy.max_size,
            });
        }

        if !policy.signatures.is_empty() && !policy.signature_matches(head) {
            errors.push(ValidationIssue::SignatureMismatch { category });
        }

        if errors.is_empty() {
            Ok(category)
        } else {
            Err(ValidationFailed {
                category: Some(category),
                errors,
            })
        }
    }
}
