use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// AprilTag code families the detector can be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TagFamily {
    Tag16h5,
    Tag25h7,
    Tag25h9,
    Tag36h9,
    Tag36h11,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid tag family specified: {0:?} (expected one of 16h5, 25h7, 25h9, 36h9, 36h11)")]
pub struct UnknownFamily(pub String);

impl TagFamily {
    pub const ALL: [TagFamily; 5] = [
        TagFamily::Tag16h5,
        TagFamily::Tag25h7,
        TagFamily::Tag25h9,
        TagFamily::Tag36h9,
        TagFamily::Tag36h11,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TagFamily::Tag16h5 => "16h5",
            TagFamily::Tag25h7 => "25h7",
            TagFamily::Tag25h9 => "25h9",
            TagFamily::Tag36h9 => "36h9",
            TagFamily::Tag36h11 => "36h11",
        }
    }

    /// Number of data bits in the code.
    pub fn bits(self) -> u32 {
        match self {
            TagFamily::Tag16h5 => 16,
            TagFamily::Tag25h7 | TagFamily::Tag25h9 => 25,
            TagFamily::Tag36h9 | TagFamily::Tag36h11 => 36,
        }
    }

    /// Minimum hamming distance between two codes of the family.
    pub fn min_hamming(self) -> u32 {
        match self {
            TagFamily::Tag16h5 => 5,
            TagFamily::Tag25h7 => 7,
            TagFamily::Tag25h9 | TagFamily::Tag36h9 => 9,
            TagFamily::Tag36h11 => 11,
        }
    }
}

impl Default for TagFamily {
    fn default() -> Self {
        TagFamily::Tag36h11
    }
}

impl FromStr for TagFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.strip_prefix("tag").unwrap_or(name);
        TagFamily::ALL
            .into_iter()
            .find(|family| family.name() == name)
            .ok_or_else(|| UnknownFamily(s.to_string()))
    }
}

impl TryFrom<String> for TagFamily {
    type Error = UnknownFamily;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TagFamily> for String {
    fn from(family: TagFamily) -> Self {
        family.name().to_string()
    }
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag{}", self.name())
    }
}
