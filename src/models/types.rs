//! Common domain type definitions
//!
//! This module contains the small enum types shared across the data model,
//! the filtering layer, and the statistics layer: ternary involvement
//! verdicts, three-way toggle states, and categorical patient attributes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Combined involvement status for one patient, side, and lymph node level.
///
/// Derived from raw observations by evidence combination; never stored on
/// the patient record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The level harbors metastases.
    Involved,
    /// The level is free of metastases.
    Healthy,
    /// No definite evidence either way.
    Unknown,
}

impl Verdict {
    /// Nullable-boolean view used when matching toggles against verdicts.
    #[must_use]
    pub const fn as_option(self) -> Option<bool> {
        match self {
            Self::Involved => Some(true),
            Self::Healthy => Some(false),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub const fn is_involved(self) -> bool {
        matches!(self, Self::Involved)
    }
}

impl From<Option<bool>> for Verdict {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Involved,
            Some(false) => Self::Healthy,
            None => Self::Unknown,
        }
    }
}

/// State of a three-way dashboard toggle.
///
/// A toggle matches a nullable boolean by exact value: `Yes` keeps only
/// affirmative records, `No` keeps only negative records (an unknown value
/// matches neither), and `Any` keeps everything. The dashboard submits
/// toggles as the integers +1, 0 and -1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// Keep only records where the value is true / the verdict is involved.
    Yes,
    /// Keep only records where the value is false / the verdict is healthy.
    No,
    /// Do not filter on this value.
    #[default]
    Any,
}

impl Toggle {
    /// Does a nullable attribute value pass this toggle?
    #[must_use]
    pub const fn matches(self, value: Option<bool>) -> bool {
        match self {
            Self::Yes => matches!(value, Some(true)),
            Self::No => matches!(value, Some(false)),
            Self::Any => true,
        }
    }

    /// Does a combined verdict pass this toggle?
    #[must_use]
    pub const fn matches_verdict(self, verdict: Verdict) -> bool {
        self.matches(verdict.as_option())
    }

    #[must_use]
    pub const fn is_any(self) -> bool {
        matches!(self, Self::Any)
    }

    /// Wire representation used by the dashboard's three-way buttons.
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Yes => 1,
            Self::No => -1,
            Self::Any => 0,
        }
    }
}

impl TryFrom<i8> for Toggle {
    type Error = Error;

    fn try_from(value: i8) -> Result<Self, Error> {
        match value {
            1 => Ok(Self::Yes),
            -1 => Ok(Self::No),
            0 => Ok(Self::Any),
            other => Err(Error::validation(format!(
                "invalid toggle value {other}, expected +1, 0 or -1"
            ))),
        }
    }
}

impl Serialize for Toggle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for Toggle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i8::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Sex of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    /// Male
    Male,
    /// Female
    Female,
    /// Unknown or not recorded
    Unknown,
}

impl From<&str> for Sex {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "1" => Self::Male,
            "f" | "female" | "2" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

/// Stage of the primary tumor, categorizing size and tissue infiltration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TStage {
    /// Carcinoma in situ or not staged
    T0,
    /// T1
    T1,
    /// T2
    T2,
    /// T3
    T3,
    /// T4
    T4,
}

impl TStage {
    /// All stages in ascending order.
    pub const ALL: [Self; 5] = [Self::T0, Self::T1, Self::T2, Self::T3, Self::T4];

    /// Numeric stage, 0 through 4.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::T0 => 0,
            Self::T1 => 1,
            Self::T2 => 2,
            Self::T3 => 3,
            Self::T4 => 4,
        }
    }

    /// Index into stage-keyed count arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self.as_u8() as usize
    }
}

impl TryFrom<u8> for TStage {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::T0),
            1 => Ok(Self::T1),
            2 => Ok(Self::T2),
            3 => Ok(Self::T3),
            4 => Ok(Self::T4),
            other => Err(Error::validation(format!(
                "invalid T-stage {other}, expected 0 through 4"
            ))),
        }
    }
}

impl std::fmt::Display for TStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.as_u8())
    }
}

impl Serialize for TStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for TStage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}
