//! Cohort filtering
//!
//! Applies validated query criteria to patients. Every non-ignore
//! criterion must pass for a patient to match (logical AND), and the
//! per-level toggles are matched against the combined verdicts, so one
//! filtering pass over the cohort costs O(patients × criteria).

use std::sync::Arc;

use crate::combine::PatientVerdicts;
use crate::error::Result;
use crate::filter::criteria::CohortCriteria;
use crate::models::lnl::{Lnl, Side};
use crate::models::patient::Patient;
use crate::models::types::Toggle;

/// A validated, ready-to-evaluate cohort filter.
#[derive(Debug, Clone)]
pub struct CohortFilter<'a> {
    criteria: &'a CohortCriteria,
}

impl<'a> CohortFilter<'a> {
    /// Wrap criteria for evaluation, rejecting malformed toggles first.
    pub fn new(criteria: &'a CohortCriteria) -> Result<Self> {
        criteria.validate()?;
        Ok(Self { criteria })
    }

    /// Does one patient satisfy every criterion?
    #[must_use]
    pub fn matches(&self, patient: &Patient, verdicts: &PatientVerdicts) -> bool {
        let criteria = self.criteria;

        if let Some(datasets) = &criteria.datasets
            && !datasets.contains(&patient.dataset)
        {
            return false;
        }
        if let Some(t_stages) = &criteria.t_stages
            && !t_stages.contains(&patient.t_stage)
        {
            return false;
        }
        if let Some(subsites) = &criteria.subsites {
            match patient.subsite_group() {
                Some(group) if subsites.contains(&group) => {}
                _ => return false,
            }
        }

        if !criteria.smoke.matches(patient.smoke)
            || !criteria.hpv.matches(patient.hpv)
            || !criteria.surgery.matches(patient.surgery)
            || !criteria.central.matches(patient.central)
            || !criteria.midext.matches(patient.midext)
        {
            return false;
        }

        match criteria.n_plus {
            Toggle::Yes if !verdicts.any_involved() => return false,
            Toggle::No if verdicts.any_involved() => return false,
            _ => {}
        }

        for side in Side::ALL {
            let toggles = criteria.side(side);
            for lnl in Lnl::ALL {
                if !toggles.get(lnl).matches_verdict(verdicts.get(side, lnl)) {
                    return false;
                }
            }
        }

        true
    }

    /// Indices of the matching patients, pairing each patient with its
    /// combined verdicts.
    #[must_use]
    pub fn filter_cohort(
        &self,
        patients: &[Arc<Patient>],
        verdicts: &[PatientVerdicts],
    ) -> Vec<usize> {
        patients
            .iter()
            .zip(verdicts)
            .enumerate()
            .filter(|(_, (patient, verdicts))| self.matches(patient, verdicts))
            .map(|(index, _)| index)
            .collect()
    }
}
