use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DataError, Result};

/// Game release a data set was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GameVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse version from a string (e.g., "1.20.4", "1.21")
    pub fn from_string(s: &str) -> Result<Self> {
        let invalid = || DataError::InvalidVersion(s.to_string());
        let mut parts = s.trim().split('.');

        let mut next = |required: bool| -> Result<u32> {
            match parts.next() {
                Some(part) => part.parse::<u32>().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(true)?;
        let patch = next(false)?;

        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, patch))
    }

    /// Parse a drop name (e.g. "trails_and_tales") or a numeric version
    pub fn from_release_name(s: &str) -> Result<Self> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "caves_and_cliffs" | "caves_cliffs" => Ok(Self::new(1, 18, 0)),
            "wild" | "the_wild_update" | "wild_update" => Ok(Self::new(1, 19, 0)),
            "trails_and_tales" | "trails_tales" => Ok(Self::new(1, 20, 0)),
            "tricky_trials" => Ok(Self::new(1, 21, 0)),
            _ => Self::from_string(s),
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl FromStr for GameVersion {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_release_name(s)
    }
}

impl Serialize for GameVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GameVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_string(&text).map_err(serde::de::Error::custom)
    }
}
