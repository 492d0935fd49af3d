//! Redirect entry entity and its publication state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum stored length of `old_url`, in characters.
pub const OLD_URL_MAX_LEN: usize = 255;

/// Tri-state status of a redirect entry.
///
/// Disabled entries are the only ones eligible for purge. Serialized as its
/// integer value (`0`, `1`, `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum PublishState {
    Disabled = 0,
    Enabled = 1,
    Archived = 2,
}

impl PublishState {
    pub const ALL: [PublishState; 3] = [
        PublishState::Disabled,
        PublishState::Enabled,
        PublishState::Archived,
    ];

    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl From<PublishState> for i16 {
    fn from(state: PublishState) -> Self {
        state.as_i16()
    }
}

impl TryFrom<i16> for PublishState {
    type Error = InvalidPublishState;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PublishState::Disabled),
            1 => Ok(PublishState::Enabled),
            2 => Ok(PublishState::Archived),
            other => Err(InvalidPublishState(other)),
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i16())
    }
}

/// A `published` value outside `{0, 1, 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("published state must be 0, 1 or 2, got {0}")]
pub struct InvalidPublishState(pub i16);

/// A persisted mapping from a legacy URL to its replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectEntry {
    pub id: i64,
    /// Normalized absolute source URL, at most [`OLD_URL_MAX_LEN`] characters.
    pub old_url: String,
    /// Destination; empty when no target is configured yet.
    pub new_url: String,
    pub referer: Option<String>,
    pub comment: Option<String>,
    pub hits: i64,
    pub published: PublishState,
    pub created_date: DateTime<Utc>,
}

impl RedirectEntry {
    pub fn is_disabled(&self) -> bool {
        self.published == PublishState::Disabled
    }

    /// Returns true when a destination has been configured.
    pub fn has_target(&self) -> bool {
        !self.new_url.is_empty()
    }
}

/// Input for inserting an entry. `old_url` must already be normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRedirect {
    pub old_url: String,
    pub new_url: String,
    pub referer: String,
    pub comment: String,
    pub published: PublishState,
    pub created_date: DateTime<Utc>,
}

impl NewRedirect {
    /// Builds an imported entry: disabled, no hits, empty referer and comment.
    pub fn imported(old_url: String, new_url: String, created_date: DateTime<Utc>) -> Self {
        Self {
            old_url,
            new_url,
            referer: String::new(),
            comment: String::new(),
            published: PublishState::Disabled,
            created_date,
        }
    }
}

/// Partial update of an existing entry.
///
/// `None` fields are left unchanged. `comment: Some(None)` clears the comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectPatch {
    pub new_url: Option<String>,
    pub published: Option<PublishState>,
    pub comment: Option<Option<String>>,
}

impl RedirectPatch {
    pub fn is_empty(&self) -> bool {
        self.new_url.is_none() && self.published.is_none() && self.comment.is_none()
    }
}
