//! Progression models over hidden lymphatic involvement states.
//!
//! A progression model assigns prior probability mass to every joint
//! involvement state of a fixed set of regions (side + level pairs). The
//! `TabulatedModel` implementation carries that prior as a precomputed table
//! with one entry per state, which is how trained model checkpoints are
//! shipped: sampling the underlying graphical model is done offline and only
//! the resulting state distribution is needed at query time.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Lnl, Side};

/// Upper bound on the number of regions a tabulated model may cover.
///
/// The state table holds `2^R` entries, so this caps memory at roughly one
/// million floats per model.
pub const MAX_MODEL_REGIONS: usize = 20;

/// One region of a progression model: a lymph node level on a given side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelRegion {
    /// Side of the neck the region sits on.
    pub side: Side,
    /// Lymph node level.
    pub lnl: Lnl,
}

impl ModelRegion {
    /// Create a region from its side and level.
    #[must_use]
    pub const fn new(side: Side, lnl: Lnl) -> Self {
        Self { side, lnl }
    }
}

impl fmt::Display for ModelRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.side.as_str(), self.lnl.as_str())
    }
}

impl FromStr for ModelRegion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (side, lnl) = s
            .split_once('_')
            .ok_or_else(|| Error::validation(format!("invalid model region '{s}'")))?;
        let side = match side {
            "ipsi" => Side::Ipsi,
            "contra" => Side::Contra,
            other => {
                return Err(Error::validation(format!("unknown side '{other}' in region '{s}'")));
            }
        };
        Ok(Self { side, lnl: lnl.parse()? })
    }
}

impl Serialize for ModelRegion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModelRegion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether a region is involved in a given joint state.
///
/// States are indexed so that the first region occupies the most significant
/// bit: with regions `[A, B]`, state `0b10` means A involved, B healthy.
#[must_use]
pub const fn state_involves(state: usize, region_index: usize, region_count: usize) -> bool {
    (state >> (region_count - 1 - region_index)) & 1 == 1
}

/// A trained model of lymphatic progression.
///
/// Implementations answer one question: given a likelihood value for every
/// joint involvement state, what is the posterior state distribution? The
/// prior lives inside the model; callers only supply the evidence term.
pub trait ProgressionModel: Send + Sync {
    /// Regions the model covers, in state bit order.
    fn regions(&self) -> &[ModelRegion];

    /// Posterior distribution over all `2^R` states.
    ///
    /// `likelihood` must hold one entry per state, in the same order as the
    /// prior. Returns `Error::DegeneratePosterior` when the evidence assigns
    /// zero mass to every state the prior supports.
    fn posterior_joint(&self, likelihood: &[f64]) -> Result<Vec<f64>>;
}

/// Raw deserialization target for `TabulatedModel` checkpoints.
#[derive(Debug, Deserialize)]
struct RawTabulatedModel {
    regions: Vec<ModelRegion>,
    prior: Vec<f64>,
}

/// A progression model backed by a precomputed prior table.
#[derive(Debug, Clone, Serialize)]
pub struct TabulatedModel {
    regions: Vec<ModelRegion>,
    prior: Vec<f64>,
}

impl TabulatedModel {
    /// Build a model from its regions and prior state table.
    ///
    /// The prior must hold exactly `2^R` non-negative finite entries with
    /// positive total mass. It is stored as given; normalization happens in
    /// the posterior computation.
    pub fn new(regions: Vec<ModelRegion>, prior: Vec<f64>) -> Result<Self> {
        if regions.is_empty() {
            return Err(Error::validation("model must cover at least one region"));
        }
        if regions.len() > MAX_MODEL_REGIONS {
            return Err(Error::validation(format!(
                "model covers {} regions, maximum is {MAX_MODEL_REGIONS}",
                regions.len()
            )));
        }
        for (index, region) in regions.iter().enumerate() {
            if regions[..index].contains(region) {
                return Err(Error::validation(format!("duplicate model region '{region}'")));
            }
        }

        let expected = 1usize << regions.len();
        if prior.len() != expected {
            return Err(Error::validation(format!(
                "prior table has {} entries, expected {expected} for {} regions",
                prior.len(),
                regions.len()
            )));
        }
        let mut total = 0.0;
        for (state, &mass) in prior.iter().enumerate() {
            if !mass.is_finite() || mass < 0.0 {
                return Err(Error::validation(format!(
                    "prior mass {mass} for state {state} is not a non-negative finite number"
                )));
            }
            total += mass;
        }
        if total <= 0.0 {
            return Err(Error::validation("prior table has zero total mass"));
        }

        Ok(Self { regions, prior })
    }

    /// Load a model checkpoint from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let raw: RawTabulatedModel = serde_json::from_reader(BufReader::new(file))?;
        Self::new(raw.regions, raw.prior)
    }

    /// The unnormalized prior state table.
    #[must_use]
    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    /// Number of joint states the model distinguishes.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.prior.len()
    }
}

impl<'de> Deserialize<'de> for TabulatedModel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawTabulatedModel::deserialize(deserializer)?;
        Self::new(raw.regions, raw.prior).map_err(serde::de::Error::custom)
    }
}

impl ProgressionModel for TabulatedModel {
    fn regions(&self) -> &[ModelRegion] {
        &self.regions
    }

    fn posterior_joint(&self, likelihood: &[f64]) -> Result<Vec<f64>> {
        if likelihood.len() != self.prior.len() {
            return Err(Error::ConfigurationMismatch(format!(
                "likelihood has {} entries, model has {} states",
                likelihood.len(),
                self.prior.len()
            )));
        }

        let mut posterior: Vec<f64> =
            self.prior.iter().zip(likelihood).map(|(p, l)| p * l).collect();
        let total: f64 = posterior.iter().sum();
        if total <= 0.0 {
            return Err(Error::DegeneratePosterior(
                "evidence assigns zero mass to every state the prior supports".to_string(),
            ));
        }
        for mass in &mut posterior {
            *mass /= total;
        }
        Ok(posterior)
    }
}
