//! Marker identifiers.
//!
//! A marker is identified by its element `id`. Elements without one map to
//! the empty identifier, the same value the DOM `Element.id` getter returns,
//! so every anonymous marker shares a single dedup key.

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

/// Identifier of a sentinel marker.
///
/// Cheap to clone: batches hand the same identifier to the dedup set and to
/// the notification list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(Rc<str>);

impl MarkerId {
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Rc::from(id.as_ref()))
    }

    /// The identifier shared by all markers without an `id`.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MarkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MarkerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MarkerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MarkerId {
    fn from(id: String) -> Self {
        Self(Rc::from(id))
    }
}

impl From<Option<String>> for MarkerId {
    fn from(id: Option<String>) -> Self {
        id.map_or_else(Self::anonymous, Self::from)
    }
}
