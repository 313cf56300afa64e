//! Prefix-based ignore policy.

use crate::dashboard::{self, slugify, ContentError};

/// Decides whether a dashboard is outside the engine's authority.
///
/// The prefix is slugified once at construction, so matching is always
/// lower-case and punctuation-insensitive on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreFilter {
    prefix: Option<String>,
}

impl IgnoreFilter {
    /// Builds a filter. `None` or a prefix that normalises to nothing
    /// disables filtering.
    pub fn new(prefix: Option<&str>) -> Self {
        let prefix = prefix.map(slugify).filter(|p| !p.is_empty());
        Self { prefix }
    }

    /// A filter that ignores nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// The normalised prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Whether a title or identifier falls under the ignore prefix.
    pub fn is_ignored(&self, title_or_identifier: &str) -> bool {
        match &self.prefix {
            None => false,
            Some(prefix) => slugify(title_or_identifier).starts_with(prefix.as_str()),
        }
    }

    /// Whether raw dashboard content falls under the ignore prefix.
    ///
    /// Content is only parsed when a prefix is configured.
    pub fn is_ignored_content(&self, content: &[u8]) -> Result<bool, ContentError> {
        if self.prefix.is_none() {
            return Ok(false);
        }
        let identifier = dashboard::identifier_of(content)?;
        Ok(self.is_ignored(&identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_prefix_ignores_nothing() {
        let filter = IgnoreFilter::new(None);
        assert!(!filter.is_ignored("test-anything"));
        assert!(!filter.is_ignored(""));

        let filter = IgnoreFilter::new(Some(""));
        assert!(filter.prefix().is_none());
        assert!(!filter.is_ignored("test-anything"));
    }

    #[test]
    fn test_prefix_is_normalised() {
        let filter = IgnoreFilter::new(Some("  [TEST] "));
        assert_eq!(filter.prefix(), Some("test"));
        assert!(filter.is_ignored("Test Latency"));
        assert!(filter.is_ignored("test-latency"));
        assert!(!filter.is_ignored("Latency test"));
    }

    #[test]
    fn test_is_ignored_content() {
        let filter = IgnoreFilter::new(Some("scratch"));
        assert!(filter
            .is_ignored_content(br#"{"title":"Scratch: CPU"}"#)
            .unwrap());
        assert!(!filter
            .is_ignored_content(br#"{"title":"Prod CPU"}"#)
            .unwrap());
        assert!(filter.is_ignored_content(br#"{"rows":[]}"#).is_err());
    }

    #[test]
    fn test_is_ignored_content_without_prefix_skips_parsing() {
        let filter = IgnoreFilter::disabled();
        assert!(!filter.is_ignored_content(b"not json at all").unwrap());
    }
}
