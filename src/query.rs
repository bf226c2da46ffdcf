//! Query engine tying patient data, evidence combination, and risk models
//! together.
//!
//! The engine is the main entry point of the crate. It owns the modality
//! registry, a handle to the patient store, and a cache of trained risk
//! models, and exposes the two operations a dashboard needs: aggregate
//! statistics over a filtered cohort and posterior risks for a hypothetical
//! diagnosis. Both operations leave all stored data untouched, so one engine
//! can serve concurrent callers behind an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};

use crate::combine::{CombinationPolicy, EvidenceCombiner};
use crate::config::ModalityRegistry;
use crate::error::{Error, Result};
use crate::filter::{CohortCriteria, CohortFilter};
use crate::models::PatientStore;
use crate::risk::{compute_risks, DiagnosisSpec, ModelCache, ModelStore, RiskPrediction};
use crate::stats::Statistics;

/// A cohort statistics request.
///
/// `modalities = None` combines every registered modality; an explicit empty
/// selection is allowed and leaves every level unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortQuery {
    /// Names of the modalities to trust, or `None` for all of them.
    pub modalities: Option<Vec<String>>,
    /// How to reconcile disagreeing modalities.
    pub policy: CombinationPolicy,
    /// Which patients to include.
    pub criteria: CohortCriteria,
}

impl CohortQuery {
    /// A query that combines all modalities and matches every patient.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The cohort query and risk prediction engine.
pub struct QueryEngine {
    registry: ModalityRegistry,
    patients: Arc<dyn PatientStore>,
    models: ModelCache,
}

impl QueryEngine {
    /// Create an engine over a patient store and a model store.
    #[must_use]
    pub fn new(
        registry: ModalityRegistry,
        patients: Arc<dyn PatientStore>,
        models: Arc<dyn ModelStore>,
    ) -> Self {
        Self { registry, patients, models: ModelCache::new(models) }
    }

    /// The modality registry this engine combines evidence with.
    #[must_use]
    pub const fn registry(&self) -> &ModalityRegistry {
        &self.registry
    }

    /// Dataset names available in the patient store.
    #[must_use]
    pub fn dataset_names(&self) -> Vec<String> {
        self.patients.dataset_names()
    }

    /// Checkpoint handles the model store can resolve.
    #[must_use]
    pub fn model_handles(&self) -> Vec<String> {
        self.models.handles()
    }

    /// Run a cohort query and aggregate statistics over the matches.
    ///
    /// The query is validated up front: criteria must be internally
    /// consistent and every named modality and dataset must exist. The
    /// combination itself never fails, so after validation the only error
    /// source is the store.
    pub fn query_cohort(&self, query: &CohortQuery) -> Result<Statistics> {
        let start = Instant::now();

        let combiner =
            EvidenceCombiner::new(&self.registry, query.policy, query.modalities.as_deref())?;
        let filter = CohortFilter::new(&query.criteria)?;
        if let Some(datasets) = &query.criteria.datasets {
            let known = self.patients.dataset_names();
            for name in datasets {
                if !known.contains(name) {
                    return Err(Error::validation(format!("unknown dataset '{name}'")));
                }
            }
        }

        let patients = self.patients.list_patients(query.criteria.datasets.as_deref())?;
        let mut stats = Statistics::new();
        for patient in &patients {
            let verdicts = combiner.combine_patient(patient);
            if filter.matches(patient, &verdicts) {
                stats.record(patient, &verdicts);
            }
        }

        info!(
            "Matched {} of {} patients under {} policy in {:?}",
            stats.total,
            patients.len(),
            query.policy,
            start.elapsed()
        );
        Ok(stats)
    }

    /// Predict per-region involvement risks for a hypothetical diagnosis.
    ///
    /// `handle` names a trained model checkpoint; the model is loaded on
    /// first use and cached for the lifetime of the engine.
    pub fn compute_risk(&self, handle: &str, spec: &DiagnosisSpec) -> Result<RiskPrediction> {
        let start = Instant::now();
        let model = self.models.get(handle)?;
        let prediction = compute_risks(model.as_ref(), spec)?;
        info!(
            "Computed risks for {} regions of model '{handle}' in {:?}",
            prediction.regions().len(),
            start.elapsed()
        );
        Ok(prediction)
    }
}
