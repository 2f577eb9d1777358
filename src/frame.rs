//! Frame identifiers and call paths
//!
//! A [`Frame`] names one instrumented operation. A [`CallPath`] is the ordered
//! root-to-leaf sequence of frames active when a call completes. Paths are
//! kept as frame sequences and only turned into the `A -> B -> C` text form
//! at export time, so frame names containing the delimiter cannot collide.

use crate::error::{Result, TraceError};
use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Delimiter between frames in the textual path form
pub const PATH_DELIMITER: &str = " -> ";

/// Identifier of one instrumented operation
///
/// Cloning is cheap (shared `Arc<str>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Frame(Arc<str>);

impl Frame {
    /// Create a frame, rejecting empty names and names with control characters
    ///
    /// Control characters would split the line-oriented event log and the
    /// hierarchy export, so they are treated as malformed.
    pub fn new(name: &str) -> Result<Self> {
        Self::validate(name)?;
        Ok(Self(Arc::from(name)))
    }

    fn validate(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(TraceError::InvalidIdentifier {
                name: name.to_string(),
                reason: "identifier is empty",
            });
        }
        if name.chars().any(char::is_control) {
            return Err(TraceError::InvalidIdentifier {
                name: name.to_string(),
                reason: "identifier contains control characters",
            });
        }
        Ok(())
    }

    /// Frame name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Frame {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Hash, Eq and Ord all delegate to the underlying str, so lookups by &str agree
impl Borrow<str> for Frame {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Frame {
    type Error = TraceError;

    fn try_from(name: &str) -> Result<Self> {
        Frame::new(name)
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Ordered root-to-leaf sequence of frames
///
/// Ordering compares frame by frame, which is the order used by every
/// profile export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CallPath(Vec<Frame>);

impl CallPath {
    /// Create a path from frames, root first
    pub fn new(frames: Vec<Frame>) -> Self {
        Self(frames)
    }

    /// Build a path from raw names, validating each of them
    ///
    /// # Example
    ///
    /// ```
    /// use calltrace::frame::CallPath;
    ///
    /// let path = CallPath::from_names(&["main", "parse", "lex"]).unwrap();
    /// assert_eq!(path.key(), "main -> parse -> lex");
    /// ```
    pub fn from_names(names: &[&str]) -> Result<Self> {
        names
            .iter()
            .map(|name| Frame::new(name))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Frames from root to leaf
    pub fn frames(&self) -> &[Frame] {
        &self.0
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Outermost frame
    pub fn root(&self) -> Option<&Frame> {
        self.0.first()
    }

    /// Innermost frame (the call that completed)
    pub fn leaf(&self) -> Option<&Frame> {
        self.0.last()
    }

    /// Canonical textual key, e.g. `D -> B -> C`
    ///
    /// Backslashes in frame names are doubled and `->` is written as `-\>`,
    /// so the only unescaped `->` in the key is the delimiter.
    pub fn key(&self) -> String {
        let mut key = String::new();
        for (i, frame) in self.0.iter().enumerate() {
            if i > 0 {
                key.push_str(PATH_DELIMITER);
            }
            key.push_str(&escape_segment(frame.as_str()));
        }
        key
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<Vec<Frame>> for CallPath {
    fn from(frames: Vec<Frame>) -> Self {
        Self(frames)
    }
}

fn escape_segment(name: &str) -> String {
    if !name.contains('\\') && !name.contains("->") {
        return name.to_string();
    }
    name.replace('\\', "\\\\").replace("->", "-\\>")
}
