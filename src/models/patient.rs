//! Patient entity model
//!
//! This module contains the patient record as the engine reads it from a
//! patient store: demographic and tumor attributes plus the raw
//! per-modality diagnosis records. Records are immutable for the duration
//! of a query; the engine never writes back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::lnl::{InvolvementPattern, Side};
use crate::models::subsite::SubsiteGroup;
use crate::models::types::{Sex, TStage};

/// One modality's report on one side of the neck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    /// Name of the reporting modality, matching the modality registry
    pub modality: String,
    /// Side of the neck the report covers
    pub side: Side,
    /// Date of the examination
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Reported involvement per lymph node level
    #[serde(default)]
    pub pattern: InvolvementPattern,
}

impl DiagnosisRecord {
    /// Create a record, making super-levels consistent with their
    /// sub-levels (a positive sub-level forces the super-level positive).
    #[must_use]
    pub fn new(modality: impl Into<String>, side: Side, pattern: InvolvementPattern) -> Self {
        let mut pattern = pattern;
        pattern.roll_up_sublevels();
        Self {
            modality: modality.into(),
            side,
            date: None,
            pattern,
        }
    }

    /// Set the examination date.
    #[must_use]
    pub const fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// A patient of the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Opaque identifier, unique within the cohort
    pub id: String,
    /// Name of the dataset the patient belongs to
    pub dataset: String,
    /// Sex of the patient
    #[serde(default = "default_sex")]
    pub sex: Sex,
    /// Age at diagnosis in years
    #[serde(default)]
    pub age: Option<u8>,
    /// Date of the initial diagnosis
    #[serde(default)]
    pub diagnose_date: Option<NaiveDate>,
    /// Nicotine abuse
    #[serde(default)]
    pub smoke: Option<bool>,
    /// HPV p16 status
    #[serde(default)]
    pub hpv: Option<bool>,
    /// Whether a neck dissection was performed
    #[serde(default)]
    pub surgery: Option<bool>,
    /// Stage of the primary tumor
    pub t_stage: TStage,
    /// ICD-10 topography code of the primary tumor's subsite
    #[serde(default)]
    pub subsite: Option<String>,
    /// Tumor located on the mid-sagittal plane
    #[serde(default)]
    pub central: Option<bool>,
    /// Tumor extends over the mid-sagittal plane
    #[serde(default)]
    pub midext: Option<bool>,
    /// Raw diagnosis records, one per modality and side
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisRecord>,
}

const fn default_sex() -> Sex {
    Sex::Unknown
}

impl Patient {
    /// Create a patient with all attributes unknown.
    #[must_use]
    pub fn new(id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dataset: dataset.into(),
            sex: Sex::Unknown,
            age: None,
            diagnose_date: None,
            smoke: None,
            hpv: None,
            surgery: None,
            t_stage: TStage::T0,
            subsite: None,
            central: None,
            midext: None,
            diagnoses: Vec::new(),
        }
    }

    /// Append a diagnosis record.
    pub fn add_diagnosis(&mut self, record: DiagnosisRecord) {
        self.diagnoses.push(record);
    }

    /// Subsite group of the primary tumor, if the recorded ICD-10 code is
    /// listed in the group table.
    #[must_use]
    pub fn subsite_group(&self) -> Option<SubsiteGroup> {
        self.subsite.as_deref().and_then(SubsiteGroup::from_icd)
    }

    /// Diagnosis records covering one side, in record order.
    pub fn diagnoses_for_side(&self, side: Side) -> impl Iterator<Item = &DiagnosisRecord> {
        self.diagnoses.iter().filter(move |d| d.side == side)
    }
}
