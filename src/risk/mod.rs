//! Posterior risk prediction from trained progression models.
//!
//! This module turns trained model checkpoints into per-region involvement
//! risks for a hypothetical diagnosis. `model` defines the progression model
//! abstraction and the tabulated implementation, `marginalize` conditions a
//! model on findings and marginalizes the joint posterior, and `store`
//! resolves checkpoint handles and caches loaded models.

pub mod marginalize;
pub mod model;
pub mod store;

pub use marginalize::{compute_risks, DiagnosisSpec, RiskPrediction};
pub use model::{state_involves, ModelRegion, ProgressionModel, TabulatedModel, MAX_MODEL_REGIONS};
pub use store::{FileModelStore, InMemoryModelStore, ModelCache, ModelStore};
