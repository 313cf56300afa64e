//! Dashboard documents as the engine sees them.
//!
//! Content is an opaque JSON blob. The only things ever read out of it are
//! the `title` (for slugging and ignore matching) and its shape (for
//! re-indenting before it lands in the repository).

mod slug;

pub use slug::{identifier_from_path, slugify};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while inspecting dashboard content.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Dashboard content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Dashboard content has no title")]
    MissingTitle,
}

/// A named, versioned dashboard document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// The store's key. Equal to the slug of the title unless the store
    /// says otherwise.
    pub identifier: String,
    /// Human-readable name.
    pub title: String,
    /// Version assigned by the remote store.
    pub version: u64,
    /// Raw JSON document.
    pub content: Vec<u8>,
}

impl Dashboard {
    /// Builds a dashboard from raw content, deriving title and identifier.
    pub fn from_content(version: u64, content: Vec<u8>) -> Result<Self, ContentError> {
        let title = title_of(&content)?;
        Ok(Self {
            identifier: slugify(&title),
            title,
            version,
            content,
        })
    }

    /// Builds a dashboard the store already keyed. An empty key falls back
    /// to the slug of the title.
    pub fn keyed(
        identifier: impl Into<String>,
        version: u64,
        content: Vec<u8>,
    ) -> Result<Self, ContentError> {
        let mut dashboard = Self::from_content(version, content)?;
        let identifier = identifier.into();
        if !identifier.is_empty() {
            dashboard.identifier = identifier;
        }
        Ok(dashboard)
    }

    /// Repository path of this dashboard's file.
    pub fn file_name(&self) -> String {
        file_name_for(&self.identifier)
    }
}

/// Repository path for an identifier.
pub fn file_name_for(identifier: &str) -> String {
    format!("{}.json", identifier)
}

#[derive(Deserialize)]
struct TitleOnly {
    #[serde(default)]
    title: Option<String>,
}

/// Extracts the dashboard title from its JSON content.
pub fn title_of(content: &[u8]) -> Result<String, ContentError> {
    let parsed: TitleOnly = serde_json::from_slice(content)?;
    match parsed.title {
        Some(title) if !title.trim().is_empty() => Ok(title),
        _ => Err(ContentError::MissingTitle),
    }
}

/// Extracts the identifier (slug of the title) from JSON content.
pub fn identifier_of(content: &[u8]) -> Result<String, ContentError> {
    let slug = slugify(&title_of(content)?);
    if slug.is_empty() {
        Err(ContentError::MissingTitle)
    } else {
        Ok(slug)
    }
}

/// Re-serializes JSON with tab indentation so repository diffs stay stable.
///
/// Key order is preserved.
pub fn indent(content: &[u8]) -> Result<Vec<u8>, ContentError> {
    let value: serde_json::Value = serde_json::from_slice(content)?;
    Ok(to_tab_indented(&value)?)
}

/// Serializes any value as tab-indented JSON.
pub fn to_tab_indented<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
