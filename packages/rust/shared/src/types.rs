//! Core domain types shared across sitecorpus crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SiteCorpusError;

/// Converted texts that carry no content and are never written to a corpus.
pub const PLACEHOLDER_TEXTS: &[&str] = &["", "Redirecting"];

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// Prose format of the output documents. Also the document file extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured markdown.
    Md,
    /// Plain text with scripts and styles stripped.
    #[default]
    Txt,
}

impl OutputFormat {
    /// File extension (without the dot) for documents of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Md => "md",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = SiteCorpusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "md" => Ok(Self::Md),
            "txt" => Ok(Self::Txt),
            other => Err(SiteCorpusError::validation(format!(
                "invalid output format '{other}': expected one of [md, txt]"
            ))),
        }
    }
}
