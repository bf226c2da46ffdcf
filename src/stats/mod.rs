//! Cohort statistics
//!
//! This module accumulates the aggregate counts the dashboard renders:
//! per-level involvement split by side, plus counts over the categorical
//! patient attributes. Counts are exact integers; turning them into
//! percentages is a display concern handled by [`percentage`], which
//! yields nothing for an empty cohort instead of dividing by zero.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::warn;
use serde::Serialize;
use serde::ser::SerializeMap;

use crate::combine::PatientVerdicts;
use crate::models::lnl::{Lnl, Side};
use crate::models::patient::Patient;
use crate::models::subsite::SubsiteGroup;
use crate::models::types::{Sex, TStage, Verdict};

/// Verdict counts for one side and lymph node level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    /// Patients with an involved verdict
    pub involved: usize,
    /// Patients with a healthy verdict
    pub healthy: usize,
    /// Patients without definite evidence
    pub unknown: usize,
}

impl VerdictCounts {
    pub fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Involved => self.involved += 1,
            Verdict::Healthy => self.healthy += 1,
            Verdict::Unknown => self.unknown += 1,
        }
    }

    /// Sum of all three buckets.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.involved + self.healthy + self.unknown
    }
}

/// Counts of a nullable boolean patient attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TernaryCounts {
    /// Patients where the attribute is true
    pub yes: usize,
    /// Patients where the attribute is false
    pub no: usize,
    /// Patients where the attribute is not recorded
    pub unknown: usize,
}

impl TernaryCounts {
    pub fn add(&mut self, value: Option<bool>) {
        match value {
            Some(true) => self.yes += 1,
            Some(false) => self.no += 1,
            None => self.unknown += 1,
        }
    }

    /// Sum of all three buckets.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.yes + self.no + self.unknown
    }
}

/// Patient counts by sex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SexCounts {
    pub male: usize,
    pub female: usize,
    pub unknown: usize,
}

impl SexCounts {
    pub fn add(&mut self, sex: Sex) {
        match sex {
            Sex::Male => self.male += 1,
            Sex::Female => self.female += 1,
            Sex::Unknown => self.unknown += 1,
        }
    }
}

/// Verdict counts for every lymph node level of one side.
///
/// Serializes as a map from level name to counts, with every level
/// always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LnlCounts {
    counts: [VerdictCounts; Lnl::COUNT],
}

impl LnlCounts {
    #[must_use]
    pub const fn get(&self, lnl: Lnl) -> VerdictCounts {
        self.counts[lnl.index()]
    }

    fn add(&mut self, lnl: Lnl, verdict: Verdict) {
        self.counts[lnl.index()].add(verdict);
    }
}

impl Serialize for LnlCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Lnl::COUNT))?;
        for lnl in Lnl::ALL {
            map.serialize_entry(lnl.as_str(), &self.get(lnl))?;
        }
        map.end()
    }
}

/// Aggregate statistics over the matching subset of the cohort.
///
/// Every bucket group is fixed-shape: levels, T-stages and subsite groups
/// are always present with zero counts, so renderers never encounter
/// missing keys. An empty result (`total = 0`) is a valid outcome, not an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    /// Number of matching patients
    pub total: usize,
    /// Matching patients per dataset
    pub datasets: BTreeMap<String, usize>,
    /// Matching patients by sex
    pub sex: SexCounts,
    /// Nicotine abuse counts
    pub smoke: TernaryCounts,
    /// HPV status counts
    pub hpv: TernaryCounts,
    /// Neck dissection counts
    pub surgery: TernaryCounts,
    /// Central tumor location counts
    pub central: TernaryCounts,
    /// Midline extension counts
    pub midext: TernaryCounts,
    /// N-status counts: `yes` is N+ (any involved verdict), `no` is N0
    pub n_plus: TernaryCounts,
    /// Matching patients per T-stage
    #[serde(serialize_with = "serialize_t_stages")]
    pub t_stages: [usize; TStage::ALL.len()],
    /// Matching patients per subsite group
    #[serde(serialize_with = "serialize_subsites")]
    pub subsites: [usize; SubsiteGroup::COUNT],
    /// Ipsilateral involvement counts per level
    pub ipsi: LnlCounts,
    /// Contralateral involvement counts per level
    pub contra: LnlCounts,
}

impl Statistics {
    /// Empty statistics, all buckets zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one matching patient with its combined verdicts.
    pub fn record(&mut self, patient: &Patient, verdicts: &PatientVerdicts) {
        self.total += 1;
        *self.datasets.entry(patient.dataset.clone()).or_insert(0) += 1;
        self.sex.add(patient.sex);
        self.smoke.add(patient.smoke);
        self.hpv.add(patient.hpv);
        self.surgery.add(patient.surgery);
        self.central.add(patient.central);
        self.midext.add(patient.midext);
        self.n_plus.add(Some(verdicts.any_involved()));
        self.t_stages[patient.t_stage.index()] += 1;

        match patient.subsite_group() {
            Some(group) => self.subsites[group.index()] += 1,
            None => {
                if let Some(code) = &patient.subsite {
                    warn!("tumor subsite '{code}' of patient {} matches no group", patient.id);
                }
            }
        }

        for side in Side::ALL {
            for lnl in Lnl::ALL {
                let verdict = verdicts.get(side, lnl);
                match side {
                    Side::Ipsi => self.ipsi.add(lnl, verdict),
                    Side::Contra => self.contra.add(lnl, verdict),
                }
            }
        }
    }

    /// Aggregate a pre-filtered cohort.
    #[must_use]
    pub fn from_cohort<'p>(
        matches: impl IntoIterator<Item = (&'p Patient, &'p PatientVerdicts)>,
    ) -> Self {
        let mut statistics = Self::new();
        for (patient, verdicts) in matches {
            statistics.record(patient, verdicts);
        }
        statistics
    }

    /// Matching patients per subsite group, keyed by group.
    #[must_use]
    pub fn subsite_count(&self, group: SubsiteGroup) -> usize {
        self.subsites[group.index()]
    }

    /// Matching patients of one T-stage.
    #[must_use]
    pub fn t_stage_count(&self, t_stage: TStage) -> usize {
        self.t_stages[t_stage.index()]
    }

    /// Generate a human-readable cohort summary.
    #[must_use]
    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("Cohort Summary:\n");
        summary.push_str(&format!("  Matching Patients: {}\n", self.total));

        if !self.datasets.is_empty() {
            let datasets = self
                .datasets
                .iter()
                .map(|(name, count)| format!("{name}: {count}"))
                .join(", ");
            summary.push_str(&format!("  Datasets: {datasets}\n"));
        }

        summary.push_str(&format!(
            "  N+: {}\n",
            format_share(self.n_plus.yes, self.total)
        ));
        summary.push_str(&format!(
            "  Smokers: {}\n",
            format_share(self.smoke.yes, self.total)
        ));
        summary.push_str(&format!(
            "  HPV positive: {}\n",
            format_share(self.hpv.yes, self.total)
        ));

        summary.push_str("  Ipsilateral involvement:\n");
        for lnl in [Lnl::I, Lnl::II, Lnl::III, Lnl::IV, Lnl::V, Lnl::VII] {
            let counts = self.ipsi.get(lnl);
            summary.push_str(&format!(
                "    {}: {}\n",
                lnl,
                format_share(counts.involved, self.total)
            ));
        }

        summary
    }
}

/// Share of a count in the matching total, as a percentage.
///
/// Returns `None` when the total is zero so an empty cohort renders as
/// "no data" rather than failing on a division.
#[must_use]
pub fn percentage(part: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 * 100.0 / total as f64)
    }
}

fn format_share(part: usize, total: usize) -> String {
    match percentage(part, total) {
        Some(percent) => format!("{part} ({percent:.1}%)"),
        None => "no data".to_string(),
    }
}

fn serialize_t_stages<S: serde::Serializer>(
    counts: &[usize; TStage::ALL.len()],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(TStage::ALL.len()))?;
    for t_stage in TStage::ALL {
        map.serialize_entry(&t_stage.to_string(), &counts[t_stage.index()])?;
    }
    map.end()
}

fn serialize_subsites<S: serde::Serializer>(
    counts: &[usize; SubsiteGroup::COUNT],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(SubsiteGroup::COUNT))?;
    for group in SubsiteGroup::ALL {
        map.serialize_entry(group.as_str(), &counts[group.index()])?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::{CombinationPolicy, EvidenceCombiner};
    use crate::config::ModalityRegistry;
    use crate::models::lnl::InvolvementPattern;
    use crate::models::patient::DiagnosisRecord;

    fn verdicts_for(patient: &Patient) -> PatientVerdicts {
        let registry = ModalityRegistry::default_clinical();
        EvidenceCombiner::new(&registry, CombinationPolicy::Or, None)
            .unwrap()
            .combine_patient(patient)
    }

    #[test]
    fn test_counts_sum_to_total_for_every_level() {
        let mut patients = Vec::new();
        for i in 0..5 {
            let mut patient = Patient::new(format!("p{i}"), "demo");
            if i % 2 == 0 {
                patient.add_diagnosis(DiagnosisRecord::new(
                    "CT",
                    Side::Ipsi,
                    InvolvementPattern::new().with(Lnl::II, i == 0),
                ));
            }
            patients.push(patient);
        }

        let mut statistics = Statistics::new();
        for patient in &patients {
            statistics.record(patient, &verdicts_for(patient));
        }

        assert_eq!(statistics.total, 5);
        for side in Side::ALL {
            for lnl in Lnl::ALL {
                let counts = match side {
                    Side::Ipsi => statistics.ipsi.get(lnl),
                    Side::Contra => statistics.contra.get(lnl),
                };
                assert_eq!(counts.total(), 5, "{side} {lnl}");
            }
        }
    }

    #[test]
    fn test_empty_cohort_is_not_an_error() {
        let statistics = Statistics::new();
        assert_eq!(statistics.total, 0);
        assert_eq!(percentage(statistics.n_plus.yes, statistics.total), None);
        assert!(statistics.generate_summary().contains("no data"));
    }

    #[test]
    fn test_attribute_and_category_buckets() {
        let mut patient = Patient::new("p0", "clb");
        patient.sex = Sex::Female;
        patient.smoke = Some(true);
        patient.hpv = Some(false);
        patient.t_stage = TStage::T3;
        patient.subsite = Some("C09.0".to_string());

        let mut statistics = Statistics::new();
        statistics.record(&patient, &verdicts_for(&patient));

        assert_eq!(statistics.sex.female, 1);
        assert_eq!(statistics.smoke.yes, 1);
        assert_eq!(statistics.hpv.no, 1);
        assert_eq!(statistics.surgery.unknown, 1);
        assert_eq!(statistics.t_stage_count(TStage::T3), 1);
        assert_eq!(statistics.subsite_count(SubsiteGroup::Tonsil), 1);
        assert_eq!(statistics.datasets.get("clb"), Some(&1));
        // No involved verdict anywhere counts as N0.
        assert_eq!(statistics.n_plus.no, 1);
    }

    #[test]
    fn test_payload_contains_every_level_and_stage() {
        let statistics = Statistics::new();
        let payload = serde_json::to_value(&statistics).unwrap();

        for lnl in Lnl::ALL {
            assert!(payload["ipsi"][lnl.as_str()].is_object(), "{lnl}");
        }
        assert_eq!(payload["t_stages"]["T0"], 0);
        assert_eq!(payload["subsites"]["glottis"], 0);
    }

    #[test]
    fn test_percentage_display_transform() {
        assert_eq!(percentage(1, 4), Some(25.0));
        assert_eq!(percentage(0, 10), Some(0.0));
        assert_eq!(percentage(3, 0), None);
    }
}
