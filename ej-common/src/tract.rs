//! Census tract identifiers and designation categories

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Census tract identifier (GEOID text, e.g. `36005000100`)
///
/// Stored as text so it stays join-compatible with the geometry dataset's
/// `GEOID` field. Float-typed exports (`36005000100.0`) are normalized on parse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TractId(String);

impl TractId {
    /// Parse a raw identifier cell
    ///
    /// Returns `None` for an empty cell.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TractId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Official disadvantaged-community status of a tract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Designation {
    Designated,
    NotDesignated,
}

impl Designation {
    pub const DESIGNATED_TEXT: &'static str = "Designated as DAC";
    pub const NOT_DESIGNATED_TEXT: &'static str = "Not Designated as DAC";

    /// Map the categorical source text; anything unrecognized is an error
    pub fn from_text(text: &str) -> Result<Self> {
        match text.trim() {
            Self::DESIGNATED_TEXT => Ok(Self::Designated),
            Self::NOT_DESIGNATED_TEXT => Ok(Self::NotDesignated),
            other => Err(Error::UnmappedDesignation {
                value: other.to_string(),
                rows: 1,
            }),
        }
    }

    /// Binary indicator (1 = designated, 0 = not)
    pub fn flag(self) -> u8 {
        match self {
            Self::Designated => 1,
            Self::NotDesignated => 0,
        }
    }

    pub fn is_designated(self) -> bool {
        matches!(self, Self::Designated)
    }

    /// Conservative union: designated if either side is designated
    pub fn union(self, other: Self) -> Self {
        if self.is_designated() || other.is_designated() {
            Self::Designated
        } else {
            Self::NotDesignated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tract_id_strips_float_suffix() {
        assert_eq!(TractId::parse(" 36005000100.0 ").unwrap().as_str(), "36005000100");
        assert_eq!(TractId::parse("36005000100").unwrap().as_str(), "36005000100");
    }

    #[test]
    fn test_tract_id_empty_is_none() {
        assert!(TractId::parse("").is_none());
        assert!(TractId::parse("   ").is_none());
    }

    #[test]
    fn test_designation_mapping_is_total_over_known_values() {
        assert_eq!(
            Designation::from_text("Designated as DAC").unwrap(),
            Designation::Designated
        );
        assert_eq!(
            Designation::from_text("Not Designated as DAC").unwrap(),
            Designation::NotDesignated
        );
        assert_eq!(Designation::Designated.flag(), 1);
        assert_eq!(Designation::NotDesignated.flag(), 0);
    }

    #[test]
    fn test_designation_unknown_value_is_error() {
        let err = Designation::from_text("Pending").unwrap_err();
        assert!(matches!(err, Error::UnmappedDesignation { ref value, .. } if value == "Pending"));
    }

    #[test]
    fn test_designation_union() {
        use Designation::*;
        assert_eq!(Designated.union(NotDesignated), Designated);
        assert_eq!(NotDesignated.union(Designated), Designated);
        assert_eq!(NotDesignated.union(NotDesignated), NotDesignated);
    }
}
