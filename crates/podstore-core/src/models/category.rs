use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// File category enum
///
/// Every consumer matches on this exhaustively, so adding a category is a
/// compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Audio,
    Image,
    Video,
    Document,
}

impl FileCategory {
    /// All categories in derivation order.
    pub const ALL: [FileCategory; 4] = [
        FileCategory::Audio,
        FileCategory::Image,
        FileCategory::Video,
        FileCategory::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Audio => "audio",
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Document => "document",
        }
    }
}

impl Display for FileCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "audio" => Ok(FileCategory::Audio),
            "image" => Ok(FileCategory::Image),
            "video" => Ok(FileCategory::Video),
            "document" => Ok(FileCategory::Document),
            _ => Err(anyhow::anyhow!("Invalid file category: {}", s)),
        }
    }
}
