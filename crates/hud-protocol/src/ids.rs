//! Identifier newtypes shared across the HUD crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declare a transparent string identifier with the usual conversions.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of an actor (the character sheet behind a token).
    ActorId
);
string_id!(
    /// Identifier of a token placed on the canvas.
    TokenId
);
string_id!(
    /// Identifier of a user of the host application.
    UserId
);
string_id!(
    /// Identifier of a leaf action, as understood by the roll dispatcher.
    ActionId
);
string_id!(
    /// View-addressable group identifier, always derived from a [`NestId`].
    GroupId
);

/// Prefix for every [`GroupId`].
const GROUP_ID_PREFIX: &str = "group-";

/// Stable path identifying a group independent of render order.
///
/// Segments are joined with [`NestId::SEPARATOR`]; the number of segments is
/// the group level (1 = top-level).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NestId(String);

impl NestId {
    /// Separator between path segments.
    pub const SEPARATOR: char = '_';

    /// Wrap a full path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Extend this path by one segment.
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}{}{}", self.0, Self::SEPARATOR, segment))
    }

    /// Borrow the raw path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(Self::SEPARATOR)
    }

    /// Level of the group this path addresses (1 = top-level).
    pub fn level(&self) -> u32 {
        self.segments().count() as u32
    }

    /// Path of the enclosing group, or `None` for a top-level group.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(Self::SEPARATOR)
            .map(|(head, _)| Self(head.to_string()))
    }

    /// True when `self` lies strictly below `other`.
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        self.0.len() > other.0.len()
            && self.0.starts_with(&other.0)
            && self.0[other.0.len()..].starts_with(Self::SEPARATOR)
    }

    /// Derive the view identifier for this path.
    ///
    /// Characters outside `[a-z0-9_-]` are folded to `-` so the result can be
    /// used verbatim as an element id.
    pub fn group_id(&self) -> GroupId {
        let slug: String = self
            .0
            .chars()
            .map(|c| {
                let c = c.to_ascii_lowercase();
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        GroupId(format!("{GROUP_ID_PREFIX}{slug}"))
    }
}

impl fmt::Display for NestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
