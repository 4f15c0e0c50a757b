//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for user input and core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The requested countdown is shorter than one minute.
    #[error("duration must be at least 1 minute, got {minutes}")]
    DurationTooShort { minutes: u32 },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated session identifier.
    ///
    /// Fresh IDs are UUID v4 strings, but any non-empty string read back from
    /// the log (e.g. an imported legacy record) is accepted.
    SessionId, "session ID"
);

impl SessionId {
    /// Generates a fresh random session ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Separator used when tags are flattened into a single log column.
pub const TAG_SEPARATOR: &str = ", ";

/// The tags attached to a session.
///
/// A comma always separates tags, so `"a,b"` is two tags and every value
/// survives [`Tags::encode`] then [`Tags::decode`]. Tags are trimmed, empty
/// entries are dropped, and duplicates are removed case-sensitively. The list is kept sorted so that the same set of tags
/// always encodes to the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    /// Creates an empty tag list.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses the flattened column form (`"a, b, c"`).
    ///
    /// Splits on commas rather than the exact separator so that hand-edited
    /// values like `"a,b"` still decode.
    pub fn decode(s: &str) -> Self {
        s.split(',').collect()
    }

    /// Flattens the tags into the column form.
    pub fn encode(&self) -> String {
        self.0.join(TAG_SEPARATOR)
    }

    /// Merges another tag list into this one.
    pub fn merge(&mut self, other: impl IntoIterator<Item = impl AsRef<str>>) {
        for tag in other {
            self.insert(tag.as_ref());
        }
    }

    fn insert(&mut self, tags: &str) {
        for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Err(pos) = self.0.binary_search_by(|t| t.as_str().cmp(tag)) {
                self.0.insert(pos, tag.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Self::new();
        tags.merge(iter);
        tags
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
