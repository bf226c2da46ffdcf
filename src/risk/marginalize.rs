//! Risk marginalization for a hypothetical diagnosis.
//!
//! Given a progression model and a set of imaging findings with a stated
//! sensitivity and specificity, this computes the posterior probability of
//! involvement for every region the model covers. The evidence enters as a
//! per-state likelihood, the model applies its prior, and the joint posterior
//! is then marginalized region by region.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{InvolvementPattern, Lnl, Side};
use crate::risk::model::{state_involves, ModelRegion, ProgressionModel};

/// A hypothetical diagnosis to condition a progression model on.
///
/// Findings are entered per side as an involvement pattern; levels left
/// unknown contribute no evidence. `sensitivity` and `specificity` describe
/// the assumed reliability of the modality behind the findings and apply to
/// all of them uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisSpec {
    /// Probability that an involved region yields a positive finding.
    pub sensitivity: f64,
    /// Probability that a healthy region yields a negative finding.
    pub specificity: f64,
    /// Findings on the tumor side.
    #[serde(default)]
    pub ipsi: InvolvementPattern,
    /// Findings on the opposite side.
    #[serde(default)]
    pub contra: InvolvementPattern,
}

impl DiagnosisSpec {
    /// Create a spec with the given reliability and no findings yet.
    #[must_use]
    pub fn new(sensitivity: f64, specificity: f64) -> Self {
        Self {
            sensitivity,
            specificity,
            ipsi: InvolvementPattern::new(),
            contra: InvolvementPattern::new(),
        }
    }

    /// Add a finding for one region.
    #[must_use]
    pub fn with_finding(mut self, side: Side, lnl: Lnl, positive: bool) -> Self {
        match side {
            Side::Ipsi => self.ipsi.set(lnl, Some(positive)),
            Side::Contra => self.contra.set(lnl, Some(positive)),
        }
        self
    }

    /// Check that sensitivity and specificity are usable probabilities.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("sensitivity", self.sensitivity), ("specificity", self.specificity)]
        {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(Error::validation(format!(
                    "{name} {value} is outside the valid range (0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// All definite findings, as (region, positive) pairs.
    pub fn findings(&self) -> impl Iterator<Item = (ModelRegion, bool)> + '_ {
        let ipsi = self.ipsi.entries().filter_map(|(lnl, value)| {
            value.map(|positive| (ModelRegion::new(Side::Ipsi, lnl), positive))
        });
        let contra = self.contra.entries().filter_map(|(lnl, value)| {
            value.map(|positive| (ModelRegion::new(Side::Contra, lnl), positive))
        });
        ipsi.chain(contra)
    }
}

/// Posterior involvement probability for every region of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskPrediction {
    regions: Vec<ModelRegion>,
    risks: Vec<f64>,
}

impl RiskPrediction {
    /// Regions in model order.
    #[must_use]
    pub fn regions(&self) -> &[ModelRegion] {
        &self.regions
    }

    /// Risk for one region, if the model covers it.
    #[must_use]
    pub fn get(&self, side: Side, lnl: Lnl) -> Option<f64> {
        self.regions
            .iter()
            .position(|region| region.side == side && region.lnl == lnl)
            .map(|index| self.risks[index])
    }

    /// Iterate over (region, risk) pairs in model order.
    pub fn iter(&self) -> impl Iterator<Item = (ModelRegion, f64)> + '_ {
        self.regions.iter().copied().zip(self.risks.iter().copied())
    }
}

impl fmt::Display for RiskPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (region, risk)) in self.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{region}: {:.1}%", risk * 100.0)?;
        }
        Ok(())
    }
}

impl Serialize for RiskPrediction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.regions.len()))?;
        for (region, risk) in self.iter() {
            map.serialize_entry(&region.to_string(), &risk)?;
        }
        map.end()
    }
}

/// Compute per-region involvement risks for a hypothetical diagnosis.
///
/// Every finding must name a region the model covers; anything else is a
/// `ConfigurationMismatch`. A spec without findings yields the marginalized
/// prior.
pub fn compute_risks(
    model: &dyn ProgressionModel,
    spec: &DiagnosisSpec,
) -> Result<RiskPrediction> {
    spec.validate()?;

    let regions = model.regions();
    let mut findings: Vec<(usize, bool)> = Vec::new();
    for (region, positive) in spec.findings() {
        let index = regions
            .iter()
            .position(|candidate| *candidate == region)
            .ok_or_else(|| {
                Error::ConfigurationMismatch(format!(
                    "diagnosis names region '{region}' which the model does not cover"
                ))
            })?;
        findings.push((index, positive));
    }

    let state_count = 1usize << regions.len();
    let mut likelihood = vec![1.0; state_count];
    for (state, value) in likelihood.iter_mut().enumerate() {
        for &(index, positive) in &findings {
            let involved = state_involves(state, index, regions.len());
            *value *= match (involved, positive) {
                (true, true) => spec.sensitivity,
                (true, false) => 1.0 - spec.sensitivity,
                (false, true) => 1.0 - spec.specificity,
                (false, false) => spec.specificity,
            };
        }
    }

    let posterior = model.posterior_joint(&likelihood)?;

    let mut risks = vec![0.0; regions.len()];
    for (state, &mass) in posterior.iter().enumerate() {
        for (index, risk) in risks.iter_mut().enumerate() {
            if state_involves(state, index, regions.len()) {
                *risk += mass;
            }
        }
    }

    Ok(RiskPrediction { regions: regions.to_vec(), risks })
}
