//! Status lines shown to the user.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which stage of the pipeline a status line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    /// Source download progress.
    Fetch,

    /// Container parsing.
    Demux,

    /// Decoder configuration and errors.
    Decode,

    /// Presentation rate and position.
    Render,
}

impl StatusCategory {
    /// Returns the wire name of this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Demux => "demux",
            Self::Decode => "decode",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch of status lines keyed by category.
///
/// Serializes as a flat object, e.g. `{"decode": "avc1.64001f @ 1280x720"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMessage(BTreeMap<StatusCategory, String>);

impl StatusMessage {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line for `category`, replacing any previous one.
    pub fn set(&mut self, category: StatusCategory, message: impl Into<String>) {
        self.0.insert(category, message.into());
    }

    /// Get the line for `category`.
    pub fn get(&self, category: StatusCategory) -> Option<&str> {
        self.0.get(&category).map(String::as_str)
    }

    /// Number of categories present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no category is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the lines in category order.
    pub fn iter(&self) -> impl Iterator<Item = (StatusCategory, &str)> {
        self.0.iter().map(|(category, line)| (*category, line.as_str()))
    }
}

/// Anything that accepts status lines.
///
/// Implemented by the engine's status reporter and handed to
/// collaborators so they can report progress without depending on the
/// engine.
pub trait StatusSink: Send + Sync {
    /// Record the latest line for `category`.
    fn report(&self, category: StatusCategory, message: String);
}
