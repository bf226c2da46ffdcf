//! Patient collections
//!
//! This module defines the read-only store interface the query engine
//! consumes patients through, together with an in-memory implementation
//! that indexes patients by dataset.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::models::patient::Patient;

/// Read-only source of patients, keyed by dataset name.
///
/// `list_patients(None)` yields the whole cohort. Unknown dataset names
/// yield no patients; callers that need strict name checking validate the
/// selection against [`PatientStore::dataset_names`] first.
pub trait PatientStore: Send + Sync {
    /// Names of all datasets in the store, sorted.
    fn dataset_names(&self) -> Vec<String>;

    /// Patients of the selected datasets, or of all datasets when no
    /// selection is given.
    fn list_patients(&self, datasets: Option<&[String]>) -> Result<Vec<Arc<Patient>>>;
}

/// A collection of patients that can be efficiently queried by dataset.
#[derive(Debug, Default)]
pub struct PatientCollection {
    /// Patients by dataset name
    patients_by_dataset: FxHashMap<String, Vec<Arc<Patient>>>,
}

impl PatientCollection {
    /// Create a new empty patient collection
    #[must_use]
    pub fn new() -> Self {
        Self {
            patients_by_dataset: FxHashMap::default(),
        }
    }

    /// Create a collection from a vector of patients
    #[must_use]
    pub fn from_patients(patients: Vec<Patient>) -> Self {
        let mut collection = Self::new();
        for patient in patients {
            collection.add_patient(patient);
        }
        collection
    }

    /// Add a patient to its dataset.
    ///
    /// Diagnosis records are normalized on the way in so super-levels are
    /// consistent with their sub-levels, whatever path produced the record.
    pub fn add_patient(&mut self, mut patient: Patient) {
        for record in &mut patient.diagnoses {
            record.pattern.roll_up_sublevels();
        }
        self.patients_by_dataset
            .entry(patient.dataset.clone())
            .or_default()
            .push(Arc::new(patient));
    }

    /// Find patients by a specific predicate
    #[must_use]
    pub fn find_by<F>(&self, predicate: F) -> Vec<Arc<Patient>>
    where
        F: Fn(&Patient) -> bool,
    {
        self.patients_by_dataset
            .values()
            .flatten()
            .filter(|patient| predicate(patient))
            .cloned()
            .collect()
    }

    /// Total number of patients across all datasets.
    #[must_use]
    pub fn count(&self) -> usize {
        self.patients_by_dataset.values().map(Vec::len).sum()
    }

    /// Number of patients in one dataset.
    #[must_use]
    pub fn dataset_count(&self, dataset: &str) -> usize {
        self.patients_by_dataset.get(dataset).map_or(0, Vec::len)
    }
}

impl PatientStore for PatientCollection {
    fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.patients_by_dataset.keys().cloned().collect();
        names.sort();
        names
    }

    fn list_patients(&self, datasets: Option<&[String]>) -> Result<Vec<Arc<Patient>>> {
        let mut patients = Vec::new();
        match datasets {
            Some(selection) => {
                for name in selection {
                    if let Some(entries) = self.patients_by_dataset.get(name) {
                        patients.extend(entries.iter().cloned());
                    }
                }
            }
            None => {
                for name in self.dataset_names() {
                    patients.extend(self.patients_by_dataset[&name].iter().cloned());
                }
            }
        }
        Ok(patients)
    }
}
