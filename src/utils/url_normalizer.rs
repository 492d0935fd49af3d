//! Source URL normalization against the site root.
//!
//! Redirect sources are stored as absolute URLs under the site root and capped at
//! [`OLD_URL_MAX_LEN`] characters, so that duplicate checks compare exactly what the
//! store holds.

use url::Url;

use crate::domain::entities::OLD_URL_MAX_LEN;

/// Errors that can occur while parsing the site root.
#[derive(Debug, thiserror::Error)]
pub enum SiteRootError {
    #[error("Invalid site root URL: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS site roots are allowed")]
    UnsupportedProtocol,

    #[error("Site root must not carry a query or fragment")]
    UnexpectedComponents,
}

/// Canonical root URL of the site, always ending in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRoot(String);

impl SiteRoot {
    /// Parses and canonicalizes a root URL.
    ///
    /// The host is lowercased by the URL parser and a trailing `/` is added when
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`SiteRootError`] for malformed, non-HTTP(S), or query/fragment
    /// carrying URLs.
    pub fn parse(input: &str) -> Result<Self, SiteRootError> {
        let url =
            Url::parse(input.trim()).map_err(|e| SiteRootError::InvalidFormat(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(SiteRootError::UnsupportedProtocol),
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(SiteRootError::UnexpectedComponents);
        }

        let mut root = url.to_string();
        if !root.ends_with('/') {
            root.push('/');
        }

        Ok(Self(root))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalizes a redirect source URL.
    ///
    /// Sources that do not already start with the root are joined onto it (a
    /// leading `/` is not doubled). The result is truncated to
    /// [`OLD_URL_MAX_LEN`] characters.
    pub fn normalize_source(&self, source: &str) -> String {
        let source = source.trim();
        let absolute = if source.starts_with(self.0.as_str()) {
            source.to_string()
        } else {
            format!("{}{}", self.0, source.trim_start_matches('/'))
        };

        truncate_chars(absolute, OLD_URL_MAX_LEN)
    }
}

impl std::fmt::Display for SiteRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination URLs are stored verbatim; absent means "no target yet".
pub fn normalize_destination(destination: Option<&str>) -> String {
    destination.unwrap_or_default().to_string()
}

fn truncate_chars(mut value: String, max: usize) -> String {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
    value
}
