//! Query criteria
//!
//! The full set of dashboard filter settings for one cohort query:
//! dataset and category selections, three-way toggles on patient
//! attributes, and per-side, per-level involvement toggles. The
//! hierarchical consistency between a super-level toggle and its
//! sub-level toggles is validated here, once per request, before any
//! patient is examined.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::lnl::{Lnl, Side};
use crate::models::subsite::SubsiteGroup;
use crate::models::types::{TStage, Toggle};

/// Three-way toggles for every lymph node level of one side.
///
/// Serializes as a map from level name to toggle value; levels left on
/// `Any` are omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Toggle>", into = "BTreeMap<String, Toggle>")]
pub struct LnlToggles {
    values: [Toggle; Lnl::COUNT],
}

impl LnlToggles {
    /// All levels on `Any`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: [Toggle::Any; Lnl::COUNT],
        }
    }

    #[must_use]
    pub const fn get(&self, lnl: Lnl) -> Toggle {
        self.values[lnl.index()]
    }

    pub fn set(&mut self, lnl: Lnl, toggle: Toggle) {
        self.values[lnl.index()] = toggle;
    }

    /// Builder-style setter used by tests and fixtures.
    #[must_use]
    pub const fn with(mut self, lnl: Lnl, toggle: Toggle) -> Self {
        self.values[lnl.index()] = toggle;
        self
    }

    /// True when every level is on `Any`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|toggle| toggle.is_any())
    }

    /// Check super-level toggles against their sub-level toggles.
    ///
    /// Two rules, mirroring what the dashboard enforces in its UI: both
    /// sub-levels on `Yes` require the super-level on `Yes`, and a
    /// super-level on `No` forbids either sub-level on `Yes`. Violations
    /// are rejected, never silently resolved.
    pub fn validate_hierarchy(&self, side: Side) -> Result<()> {
        for (sup, a, b) in Lnl::DIVISIBLE {
            let (parent, sub_a, sub_b) = (self.get(sup), self.get(a), self.get(b));

            if parent == Toggle::No && (sub_a == Toggle::Yes || sub_b == Toggle::Yes) {
                return Err(Error::validation(format!(
                    "{side} {sup} is excluded while one of its sub-levels is required"
                )));
            }
            if sub_a == Toggle::Yes && sub_b == Toggle::Yes && parent != Toggle::Yes {
                return Err(Error::validation(format!(
                    "{side} {a} and {b} are both required, so {sup} must be required too"
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<String, Toggle>> for LnlToggles {
    type Error = Error;

    fn try_from(map: BTreeMap<String, Toggle>) -> Result<Self> {
        let mut toggles = Self::new();
        for (name, toggle) in map {
            toggles.set(Lnl::from_str(&name)?, toggle);
        }
        Ok(toggles)
    }
}

impl From<LnlToggles> for BTreeMap<String, Toggle> {
    fn from(toggles: LnlToggles) -> Self {
        Lnl::ALL
            .into_iter()
            .map(|lnl| (lnl, toggles.get(lnl)))
            .filter(|(_, toggle)| !toggle.is_any())
            .map(|(lnl, toggle)| (lnl.as_str().to_string(), toggle))
            .collect()
    }
}

/// All filter settings of one cohort query.
///
/// The default criteria match every patient. Multi-selects use `None`
/// for "no restriction"; an empty selection matches nobody.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortCriteria {
    /// Restrict to these datasets
    pub datasets: Option<Vec<String>>,
    /// Restrict to these T-stages
    pub t_stages: Option<Vec<TStage>>,
    /// Restrict to these tumor subsite groups
    pub subsites: Option<Vec<SubsiteGroup>>,
    /// Nicotine abuse toggle
    pub smoke: Toggle,
    /// HPV status toggle
    pub hpv: Toggle,
    /// Neck dissection toggle
    pub surgery: Toggle,
    /// Central tumor location toggle
    pub central: Toggle,
    /// Midline extension toggle
    pub midext: Toggle,
    /// N-status toggle: `Yes` requires at least one involved verdict,
    /// `No` requires none
    pub n_plus: Toggle,
    /// Involvement toggles for the ipsilateral side
    pub ipsi: LnlToggles,
    /// Involvement toggles for the contralateral side
    pub contra: LnlToggles,
}

impl CohortCriteria {
    /// Criteria that match the whole cohort.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the criteria before filtering.
    pub fn validate(&self) -> Result<()> {
        self.ipsi.validate_hierarchy(Side::Ipsi)?;
        self.contra.validate_hierarchy(Side::Contra)?;
        Ok(())
    }

    /// Toggles of one side.
    #[must_use]
    pub const fn side(&self, side: Side) -> &LnlToggles {
        match side {
            Side::Ipsi => &self.ipsi,
            Side::Contra => &self.contra,
        }
    }
}
