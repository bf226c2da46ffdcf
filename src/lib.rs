//! A Rust library for querying lymphatic involvement cohorts with
//! multi-modality evidence combination and posterior risk prediction.

pub mod combine;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod risk;
pub mod stats;
pub mod synthetic;

// Re-export the most common types for easier use
// Core types
pub use config::{Modality, ModalityRegistry};
pub use error::{Error, Result};
pub use query::{CohortQuery, QueryEngine};

// Patient data
pub use models::{
    DiagnosisRecord, InvolvementPattern, Lnl, Patient, PatientCollection, PatientStore, Sex, Side,
    SubsiteGroup, TStage, Toggle, Verdict,
};

// Evidence combination and filtering
pub use combine::{CombinationPolicy, EvidenceCombiner, PatientVerdicts};
pub use filter::{CohortCriteria, CohortFilter, LnlToggles};
pub use stats::Statistics;

// Risk prediction
pub use risk::{
    DiagnosisSpec, InMemoryModelStore, ModelCache, ModelRegion, ModelStore, ProgressionModel,
    RiskPrediction, TabulatedModel, compute_risks,
};
