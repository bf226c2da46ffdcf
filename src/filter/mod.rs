//! Cohort filtering
//!
//! This module provides the query criteria model and the conjunctive
//! filter that selects the matching subset of the cohort, evaluating
//! attribute toggles against raw patient data and involvement toggles
//! against combined verdicts.

pub mod cohort;
pub mod criteria;

pub use cohort::CohortFilter;
pub use criteria::{CohortCriteria, LnlToggles};
