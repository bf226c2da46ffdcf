//! Domain models for the lymphatic involvement cohort
//!
//! This module contains the core entities the engine operates on: the
//! fixed lymph node level topology, tumor subsite grouping, the patient
//! record with its raw diagnosis records, and the in-memory patient
//! collection.

pub mod collections;
pub mod lnl;
pub mod patient;
pub mod subsite;
pub mod types;

// Re-export commonly used types
pub use collections::{PatientCollection, PatientStore};
pub use lnl::{InvolvementPattern, Lnl, Side};
pub use patient::{DiagnosisRecord, Patient};
pub use subsite::SubsiteGroup;
pub use types::{Sex, TStage, Toggle, Verdict};
