//! Evidence combination
//!
//! Different diagnostic modalities may report conflicting involvement for
//! the same lymph node level. This module reduces the reports for one
//! patient into a single ternary verdict per side and level, under one of
//! four selectable combination policies.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::{Modality, ModalityRegistry};
use crate::error::{Error, Result};
use crate::models::lnl::{InvolvementPattern, Lnl, Side};
use crate::models::patient::Patient;
use crate::models::types::Verdict;

/// Scratch capacity covering the usual number of modalities per patient.
type ObservationVec<'a> = SmallVec<[Observation<'a>; 8]>;

/// A single reading of one lymph node level by one modality.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// The reporting modality
    pub modality: &'a Modality,
    /// Reported involvement, `None` when the modality made no call
    pub value: Option<bool>,
}

impl<'a> Observation<'a> {
    /// Create an observation.
    #[must_use]
    pub const fn new(modality: &'a Modality, value: Option<bool>) -> Self {
        Self { modality, value }
    }
}

/// Policy for reducing conflicting observations into one verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombinationPolicy {
    /// Involved on any positive report, healthy on any negative report
    /// otherwise, unknown without definite reports.
    #[serde(rename = "OR")]
    Or,
    /// Involved only when every definite report is positive. Any
    /// disagreement resolves to healthy, not unknown; this optimistic
    /// behavior is deliberate and matches the dashboard's documented
    /// semantics.
    #[serde(rename = "AND")]
    And,
    /// Likelihood-ratio comparison of the involved and healthy hypotheses
    /// under each modality's sensitivity and specificity.
    #[default]
    #[serde(rename = "maxLLH")]
    MaxLlh,
    /// The report of the most trusted (lowest-rank) modality wins.
    #[serde(rename = "rank")]
    Rank,
}

impl CombinationPolicy {
    /// All policies, in dashboard order.
    pub const ALL: [Self; 4] = [Self::Or, Self::And, Self::MaxLlh, Self::Rank];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::MaxLlh => "maxLLH",
            Self::Rank => "rank",
        }
    }

    /// Reduce the observations for one (patient, side, level) to a verdict.
    ///
    /// A region without observations is unknown under every policy.
    #[must_use]
    pub fn combine(self, observations: &[Observation<'_>]) -> Verdict {
        match self {
            Self::Or => combine_or(observations),
            Self::And => combine_and(observations),
            Self::MaxLlh => combine_max_llh(observations),
            Self::Rank => combine_rank(observations),
        }
    }
}

impl std::fmt::Display for CombinationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CombinationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown combination policy '{s}'")))
    }
}

fn combine_or(observations: &[Observation<'_>]) -> Verdict {
    let mut saw_negative = false;
    for obs in observations {
        match obs.value {
            Some(true) => return Verdict::Involved,
            Some(false) => saw_negative = true,
            None => {}
        }
    }
    if saw_negative {
        Verdict::Healthy
    } else {
        Verdict::Unknown
    }
}

fn combine_and(observations: &[Observation<'_>]) -> Verdict {
    let mut positives = 0usize;
    let mut negatives = 0usize;
    for obs in observations {
        match obs.value {
            Some(true) => positives += 1,
            Some(false) => negatives += 1,
            None => {}
        }
    }
    if positives + negatives == 0 {
        Verdict::Unknown
    } else if negatives == 0 {
        Verdict::Involved
    } else {
        Verdict::Healthy
    }
}

fn combine_max_llh(observations: &[Observation<'_>]) -> Verdict {
    // Multiply in rank order so the result does not depend on the order
    // observations are supplied in.
    let mut definite: ObservationVec<'_> = observations
        .iter()
        .copied()
        .filter(|obs| obs.value.is_some())
        .collect();
    definite.sort_by_key(|obs| obs.modality.rank);

    if definite.is_empty() {
        return Verdict::Unknown;
    }

    let mut involved_llh = 1.0;
    let mut healthy_llh = 1.0;
    for obs in &definite {
        if obs.value == Some(true) {
            involved_llh *= obs.modality.sens;
            healthy_llh *= 1.0 - obs.modality.spec;
        } else {
            involved_llh *= 1.0 - obs.modality.sens;
            healthy_llh *= obs.modality.spec;
        }
    }

    // Exact comparison: sensitivities and specificities are fixed decimal
    // configuration values, so equal likelihoods are a genuine tie.
    if involved_llh > healthy_llh {
        Verdict::Involved
    } else if involved_llh < healthy_llh {
        Verdict::Healthy
    } else {
        Verdict::Unknown
    }
}

fn combine_rank(observations: &[Observation<'_>]) -> Verdict {
    observations
        .iter()
        .min_by_key(|obs| obs.modality.rank)
        .map_or(Verdict::Unknown, |obs| Verdict::from(obs.value))
}

/// Combined verdicts for every side and level of one patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientVerdicts {
    ipsi: [Verdict; Lnl::COUNT],
    contra: [Verdict; Lnl::COUNT],
}

impl Default for PatientVerdicts {
    fn default() -> Self {
        Self {
            ipsi: [Verdict::Unknown; Lnl::COUNT],
            contra: [Verdict::Unknown; Lnl::COUNT],
        }
    }
}

impl PatientVerdicts {
    #[must_use]
    pub const fn get(&self, side: Side, lnl: Lnl) -> Verdict {
        self.side(side)[lnl.index()]
    }

    pub fn set(&mut self, side: Side, lnl: Lnl, verdict: Verdict) {
        match side {
            Side::Ipsi => self.ipsi[lnl.index()] = verdict,
            Side::Contra => self.contra[lnl.index()] = verdict,
        }
    }

    /// All verdicts of one side, indexed by [`Lnl::index`].
    #[must_use]
    pub const fn side(&self, side: Side) -> &[Verdict; Lnl::COUNT] {
        match side {
            Side::Ipsi => &self.ipsi,
            Side::Contra => &self.contra,
        }
    }

    /// Does any side and level have an involved verdict?
    #[must_use]
    pub fn any_involved(&self) -> bool {
        self.ipsi
            .iter()
            .chain(self.contra.iter())
            .any(|v| v.is_involved())
    }

    /// Derive effective super-level verdicts from the sub-levels: an
    /// involved sub-level forces the super-level involved, two healthy
    /// sub-levels force it healthy, anything else leaves the directly
    /// combined verdict.
    fn roll_up_sublevels(&mut self, side: Side) {
        for (sup, a, b) in Lnl::DIVISIBLE {
            let (va, vb) = (self.get(side, a), self.get(side, b));
            if va.is_involved() || vb.is_involved() {
                self.set(side, sup, Verdict::Involved);
            } else if va == Verdict::Healthy && vb == Verdict::Healthy {
                self.set(side, sup, Verdict::Healthy);
            }
        }
    }
}

/// Reduces a patient's raw diagnosis records to per-level verdicts, given
/// a policy and a selection of the registry's modalities.
#[derive(Debug, Clone)]
pub struct EvidenceCombiner<'a> {
    policy: CombinationPolicy,
    selected: Vec<&'a Modality>,
}

impl<'a> EvidenceCombiner<'a> {
    /// Create a combiner over a selection of the registry's modalities.
    ///
    /// `selection = None` uses every registered modality. Selecting an
    /// unregistered name is a validation error. An empty selection is
    /// allowed and yields unknown verdicts everywhere.
    pub fn new(
        registry: &'a ModalityRegistry,
        policy: CombinationPolicy,
        selection: Option<&[String]>,
    ) -> Result<Self> {
        let selected = match selection {
            None => registry.modalities().iter().collect(),
            Some(names) => {
                let mut selected = Vec::with_capacity(names.len());
                for name in names {
                    let modality = registry.get(name).ok_or_else(|| {
                        Error::validation(format!("unknown modality '{name}' in selection"))
                    })?;
                    selected.push(modality);
                }
                selected
            }
        };
        Ok(Self { policy, selected })
    }

    #[must_use]
    pub const fn policy(&self) -> CombinationPolicy {
        self.policy
    }

    /// Reduce one region's observations under the configured policy.
    #[must_use]
    pub fn combine(&self, observations: &[Observation<'_>]) -> Verdict {
        self.policy.combine(observations)
    }

    /// Combine all of a patient's records into per-side, per-level
    /// verdicts, including the effective super-level roll-up.
    #[must_use]
    pub fn combine_patient(&self, patient: &Patient) -> PatientVerdicts {
        let mut verdicts = PatientVerdicts::default();
        for side in Side::ALL {
            // One pattern slot per selected modality; a later record from
            // the same modality replaces an earlier one.
            let mut slots: SmallVec<[(usize, &InvolvementPattern); 8]> = SmallVec::new();
            for record in patient.diagnoses_for_side(side) {
                let Some(index) = self
                    .selected
                    .iter()
                    .position(|m| m.name == record.modality)
                else {
                    continue;
                };
                match slots.iter_mut().find(|(i, _)| *i == index) {
                    Some(slot) => slot.1 = &record.pattern,
                    None => slots.push((index, &record.pattern)),
                }
            }

            for lnl in Lnl::ALL {
                let mut observations: ObservationVec<'_> = SmallVec::new();
                for (index, pattern) in &slots {
                    if let Some(value) = pattern.get(lnl) {
                        observations.push(Observation {
                            modality: self.selected[*index],
                            value: Some(value),
                        });
                    }
                }
                verdicts.set(side, lnl, self.policy.combine(&observations));
            }

            verdicts.roll_up_sublevels(side);
        }
        verdicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lnl::InvolvementPattern;
    use crate::models::patient::DiagnosisRecord;

    fn obs(modality: &Modality, value: Option<bool>) -> Observation<'_> {
        Observation { modality, value }
    }

    #[test]
    fn test_every_policy_is_unknown_without_observations() {
        for policy in CombinationPolicy::ALL {
            assert_eq!(policy.combine(&[]), Verdict::Unknown, "{policy}");
        }
    }

    #[test]
    fn test_or_single_positive_dominates() {
        let mri = Modality::new("MRI", 0.9, 0.8, 1);
        let ct = Modality::new("CT", 0.85, 0.75, 2);

        let conflicting = [obs(&mri, Some(true)), obs(&ct, Some(false))];
        assert_eq!(CombinationPolicy::Or.combine(&conflicting), Verdict::Involved);

        let negative_only = [obs(&ct, Some(false))];
        assert_eq!(
            CombinationPolicy::Or.combine(&negative_only),
            Verdict::Healthy
        );
    }

    #[test]
    fn test_and_disagreement_resolves_to_healthy() {
        let mri = Modality::new("MRI", 0.9, 0.8, 1);
        let ct = Modality::new("CT", 0.85, 0.75, 2);

        let conflicting = [obs(&mri, Some(true)), obs(&ct, Some(false))];
        assert_eq!(CombinationPolicy::And.combine(&conflicting), Verdict::Healthy);

        let all_positive = [obs(&mri, Some(true)), obs(&ct, Some(true))];
        assert_eq!(
            CombinationPolicy::And.combine(&all_positive),
            Verdict::Involved
        );
    }

    #[test]
    fn test_max_llh_weighs_sensitivity_against_specificity() {
        // involved: 0.9 * (1 - 0.85) = 0.135 < healthy: (1 - 0.8) * 0.75 = 0.15
        let mri = Modality::new("MRI", 0.9, 0.8, 1);
        let ct = Modality::new("CT", 0.85, 0.75, 2);

        let observations = [obs(&mri, Some(true)), obs(&ct, Some(false))];
        assert_eq!(
            CombinationPolicy::MaxLlh.combine(&observations),
            Verdict::Healthy
        );
    }

    #[test]
    fn test_max_llh_tie_is_unknown() {
        // sens = 1 - spec makes both hypotheses equally likely.
        let coin = Modality::new("coin", 0.5, 0.5, 1);
        let observations = [obs(&coin, Some(true))];
        assert_eq!(
            CombinationPolicy::MaxLlh.combine(&observations),
            Verdict::Unknown
        );
    }

    #[test]
    fn test_rank_prefers_lowest_rank_modality() {
        let pathology = Modality::new("pathology", 1.0, 1.0, 1);
        let ct = Modality::new("CT", 0.81, 0.76, 2);

        let observations = [obs(&ct, Some(true)), obs(&pathology, Some(false))];
        assert_eq!(CombinationPolicy::Rank.combine(&observations), Verdict::Healthy);

        // An explicit no-call from the most trusted modality masks the rest.
        let masked = [obs(&ct, Some(true)), obs(&pathology, None)];
        assert_eq!(CombinationPolicy::Rank.combine(&masked), Verdict::Unknown);
    }

    #[test]
    fn test_policy_names_round_trip() {
        for policy in CombinationPolicy::ALL {
            assert_eq!(policy.as_str().parse::<CombinationPolicy>().unwrap(), policy);
        }
        assert!("majority".parse::<CombinationPolicy>().is_err());

        let decoded: CombinationPolicy = serde_json::from_str(r#""maxLLH""#).unwrap();
        assert_eq!(decoded, CombinationPolicy::MaxLlh);
    }

    #[test]
    fn test_combiner_rejects_unknown_selection() {
        let registry = ModalityRegistry::default_clinical();
        let selection = vec!["ultrasound".to_string()];
        let result = EvidenceCombiner::new(&registry, CombinationPolicy::Or, Some(&selection));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_combine_patient_uses_last_record_per_modality() {
        let registry = ModalityRegistry::default_clinical();
        let combiner = EvidenceCombiner::new(&registry, CombinationPolicy::Or, None).unwrap();

        let mut patient = Patient::new("p", "demo");
        patient.add_diagnosis(DiagnosisRecord::new(
            "CT",
            Side::Ipsi,
            InvolvementPattern::new().with(Lnl::II, true),
        ));
        patient.add_diagnosis(DiagnosisRecord::new(
            "CT",
            Side::Ipsi,
            InvolvementPattern::new().with(Lnl::II, false),
        ));

        let verdicts = combiner.combine_patient(&patient);
        assert_eq!(verdicts.get(Side::Ipsi, Lnl::II), Verdict::Healthy);
    }

    #[test]
    fn test_combine_patient_rolls_up_sublevels() {
        let registry = ModalityRegistry::default_clinical();
        let combiner = EvidenceCombiner::new(&registry, CombinationPolicy::Or, None).unwrap();

        let mut pattern = InvolvementPattern::new().with(Lnl::IIa, true);
        pattern.set(Lnl::IIb, Some(false));
        let mut patient = Patient::new("p", "demo");
        patient.add_diagnosis(DiagnosisRecord::new("MRI", Side::Contra, pattern));

        let verdicts = combiner.combine_patient(&patient);
        assert_eq!(verdicts.get(Side::Contra, Lnl::II), Verdict::Involved);
        assert_eq!(verdicts.get(Side::Contra, Lnl::IIb), Verdict::Healthy);
        // The untouched side stays unknown.
        assert_eq!(verdicts.get(Side::Ipsi, Lnl::II), Verdict::Unknown);
    }

    #[test]
    fn test_ignored_modalities_do_not_contribute() {
        let registry = ModalityRegistry::default_clinical();
        let selection = vec!["MRI".to_string()];
        let combiner =
            EvidenceCombiner::new(&registry, CombinationPolicy::Or, Some(&selection)).unwrap();

        let mut patient = Patient::new("p", "demo");
        patient.add_diagnosis(DiagnosisRecord::new(
            "CT",
            Side::Ipsi,
            InvolvementPattern::new().with(Lnl::III, true),
        ));

        let verdicts = combiner.combine_patient(&patient);
        assert_eq!(verdicts.get(Side::Ipsi, Lnl::III), Verdict::Unknown);
    }
}
