//! Modality configuration
//!
//! This module holds the registry of diagnostic modalities the engine
//! combines evidence from. Each modality carries the sensitivity and
//! specificity of its reports and a trust rank used by the rank
//! combination policy. The registry is built once at process start,
//! validated, and never mutated afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A diagnostic modality with its diagnostic performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modality {
    /// Name the modality is referenced by in diagnosis records
    pub name: String,
    /// Probability of a positive report given true involvement
    pub sens: f64,
    /// Probability of a negative report given a truly healthy level
    pub spec: f64,
    /// Trust rank, lower is more trusted; ranks form a permutation of 1..=N
    pub rank: u32,
}

impl Modality {
    /// Create a modality entry.
    #[must_use]
    pub fn new(name: impl Into<String>, sens: f64, spec: f64, rank: u32) -> Self {
        Self {
            name: name.into(),
            sens,
            spec,
            rank,
        }
    }
}

/// The set of active diagnostic modalities.
///
/// Construction validates the whole table; once built the registry is
/// read-only and shared by reference with every combiner call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Modality>", into = "Vec<Modality>")]
pub struct ModalityRegistry {
    modalities: Vec<Modality>,
}

impl ModalityRegistry {
    /// Build a registry from a modality table.
    ///
    /// Fails when a name repeats, a sensitivity or specificity lies
    /// outside (0, 1], or the ranks are not a permutation of 1..=N.
    pub fn new(modalities: Vec<Modality>) -> Result<Self> {
        if modalities.is_empty() {
            return Err(Error::validation("modality registry must not be empty"));
        }

        for modality in &modalities {
            validate_probability(modality.sens, "sensitivity", &modality.name)?;
            validate_probability(modality.spec, "specificity", &modality.name)?;
        }

        let mut names: Vec<&str> = modalities.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::validation(format!(
                "duplicate modality name '{}'",
                pair[0]
            )));
        }

        let mut ranks: Vec<u32> = modalities.iter().map(|m| m.rank).collect();
        ranks.sort_unstable();
        let expected: Vec<u32> = (1..=modalities.len() as u32).collect();
        if ranks != expected {
            return Err(Error::validation(format!(
                "modality ranks must be a permutation of 1..={}, got {ranks:?}",
                modalities.len()
            )));
        }

        Ok(Self { modalities })
    }

    /// The clinical modality table of the original cohort datasets.
    ///
    /// Sensitivities and specificities are literature values; ranks put
    /// pathology-grade evidence before imaging.
    #[must_use]
    pub fn default_clinical() -> Self {
        Self {
            modalities: vec![
                Modality::new("pathology", 1.0, 1.0, 1),
                Modality::new("FNA", 0.80, 0.98, 2),
                Modality::new("diagnostic_consensus", 0.81, 0.86, 3),
                Modality::new("PET", 0.79, 0.86, 4),
                Modality::new("pCT", 0.81, 0.86, 5),
                Modality::new("CT", 0.81, 0.76, 6),
                Modality::new("MRI", 0.81, 0.63, 7),
            ],
        }
    }

    /// Load a registry from a JSON file containing a modality array.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&content)?;
        Ok(registry)
    }

    /// All modalities, in table order.
    #[must_use]
    pub fn modalities(&self) -> &[Modality] {
        &self.modalities
    }

    /// Number of active modalities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modalities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modalities.is_empty()
    }

    /// Look up a modality by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Modality> {
        self.modalities.iter().find(|m| m.name == name)
    }

    /// Names of all modalities, in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modalities.iter().map(|m| m.name.as_str())
    }
}

impl TryFrom<Vec<Modality>> for ModalityRegistry {
    type Error = Error;

    fn try_from(modalities: Vec<Modality>) -> Result<Self> {
        Self::new(modalities)
    }
}

impl From<ModalityRegistry> for Vec<Modality> {
    fn from(registry: ModalityRegistry) -> Self {
        registry.modalities
    }
}

fn validate_probability(value: f64, what: &str, modality: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{what} of modality '{modality}' must lie in (0, 1], got {value}"
        )))
    }
}
