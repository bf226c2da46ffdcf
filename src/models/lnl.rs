//! Lymph node level topology
//!
//! This module defines the fixed set of lymph node levels (LNLs) of the
//! neck, the side qualifier relative to the primary tumor, and the
//! per-level involvement pattern carried by raw diagnosis records.
//! Levels I, II and V are divided into an a and a b sub-level that roll
//! up into their super-level.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Side of the neck relative to the primary tumor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Same side as the primary tumor
    Ipsi,
    /// Opposite side of the primary tumor
    Contra,
}

impl Side {
    /// Both sides, ipsilateral first.
    pub const ALL: [Self; 2] = [Self::Ipsi, Self::Contra];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ipsi => "ipsi",
            Self::Contra => "contra",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lymph node level of the neck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Lnl {
    /// Level I (submental and submandibular)
    I,
    /// Sub-level Ia (submental)
    Ia,
    /// Sub-level Ib (submandibular)
    Ib,
    /// Level II (upper jugular)
    II,
    /// Sub-level IIa
    IIa,
    /// Sub-level IIb
    IIb,
    /// Level III (middle jugular)
    III,
    /// Level IV (lower jugular)
    IV,
    /// Level V (posterior triangle)
    V,
    /// Sub-level Va
    Va,
    /// Sub-level Vb
    Vb,
    /// Level VII (retropharyngeal and retrostyloid)
    VII,
}

impl Lnl {
    /// Number of levels, including sub-levels.
    pub const COUNT: usize = 12;

    /// All levels in reporting order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::I,
        Self::Ia,
        Self::Ib,
        Self::II,
        Self::IIa,
        Self::IIb,
        Self::III,
        Self::IV,
        Self::V,
        Self::Va,
        Self::Vb,
        Self::VII,
    ];

    /// The divisible levels as (super-level, sub-level a, sub-level b).
    pub const DIVISIBLE: [(Self, Self, Self); 3] = [
        (Self::I, Self::Ia, Self::Ib),
        (Self::II, Self::IIa, Self::IIb),
        (Self::V, Self::Va, Self::Vb),
    ];

    /// Position in [`Self::ALL`], used to index per-level arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::I => 0,
            Self::Ia => 1,
            Self::Ib => 2,
            Self::II => 3,
            Self::IIa => 4,
            Self::IIb => 5,
            Self::III => 6,
            Self::IV => 7,
            Self::V => 8,
            Self::Va => 9,
            Self::Vb => 10,
            Self::VII => 11,
        }
    }

    /// The two sub-levels of a divisible level.
    #[must_use]
    pub const fn sublevels(self) -> Option<(Self, Self)> {
        match self {
            Self::I => Some((Self::Ia, Self::Ib)),
            Self::II => Some((Self::IIa, Self::IIb)),
            Self::V => Some((Self::Va, Self::Vb)),
            _ => None,
        }
    }

    /// The super-level a sub-level rolls up into.
    #[must_use]
    pub const fn superlevel(self) -> Option<Self> {
        match self {
            Self::Ia | Self::Ib => Some(Self::I),
            Self::IIa | Self::IIb => Some(Self::II),
            Self::Va | Self::Vb => Some(Self::V),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::I => "I",
            Self::Ia => "Ia",
            Self::Ib => "Ib",
            Self::II => "II",
            Self::IIa => "IIa",
            Self::IIb => "IIb",
            Self::III => "III",
            Self::IV => "IV",
            Self::V => "V",
            Self::Va => "Va",
            Self::Vb => "Vb",
            Self::VII => "VII",
        }
    }
}

impl std::fmt::Display for Lnl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lnl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|lnl| lnl.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown lymph node level '{s}'")))
    }
}

/// Per-level nullable involvement, as reported by one diagnosis record for
/// one side, or as specified by one side of a risk diagnosis.
///
/// Serializes as a map from level name to boolean; levels without a
/// definite value are omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Option<bool>>",
    into = "BTreeMap<String, Option<bool>>"
)]
pub struct InvolvementPattern {
    values: [Option<bool>; Lnl::COUNT],
}

impl InvolvementPattern {
    /// Pattern with every level unreported.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: [None; Lnl::COUNT],
        }
    }

    #[must_use]
    pub const fn get(&self, lnl: Lnl) -> Option<bool> {
        self.values[lnl.index()]
    }

    pub fn set(&mut self, lnl: Lnl, value: Option<bool>) {
        self.values[lnl.index()] = value;
    }

    /// Builder-style setter used by tests and fixtures.
    #[must_use]
    pub const fn with(mut self, lnl: Lnl, involved: bool) -> Self {
        self.values[lnl.index()] = Some(involved);
        self
    }

    /// True when no level has a definite value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Iterate all levels with their nullable value.
    pub fn entries(&self) -> impl Iterator<Item = (Lnl, Option<bool>)> + '_ {
        Lnl::ALL.into_iter().map(|lnl| (lnl, self.get(lnl)))
    }

    /// Make super-levels consistent with their sub-levels: a definite
    /// positive sub-level forces the super-level positive, two definite
    /// negative sub-levels force it negative, anything else leaves the
    /// super-level as reported.
    pub fn roll_up_sublevels(&mut self) {
        for (sup, a, b) in Lnl::DIVISIBLE {
            match (self.get(a), self.get(b)) {
                (Some(true), _) | (_, Some(true)) => self.set(sup, Some(true)),
                (Some(false), Some(false)) => self.set(sup, Some(false)),
                _ => {}
            }
        }
    }
}

impl TryFrom<BTreeMap<String, Option<bool>>> for InvolvementPattern {
    type Error = Error;

    fn try_from(map: BTreeMap<String, Option<bool>>) -> Result<Self, Error> {
        let mut pattern = Self::new();
        for (name, value) in map {
            pattern.set(Lnl::from_str(&name)?, value);
        }
        Ok(pattern)
    }
}

impl From<InvolvementPattern> for BTreeMap<String, Option<bool>> {
    fn from(pattern: InvolvementPattern) -> Self {
        pattern
            .entries()
            .filter(|(_, value)| value.is_some())
            .map(|(lnl, value)| (lnl.as_str().to_string(), value))
            .collect()
    }
}
