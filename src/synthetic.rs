//! Synthetic cohort generation.
//!
//! Generates cohorts with realistic correlations for demos and tests: true
//! involvement is sampled per level with rates that rise with T-stage and
//! fall towards the lower neck, and each modality then reports that hidden
//! state through its own sensitivity and specificity. The generated records
//! therefore disagree with each other exactly the way real diagnostic data
//! does.

use chrono::{Days, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::config::ModalityRegistry;
use crate::models::{DiagnosisRecord, InvolvementPattern, Lnl, Patient, Sex, Side, TStage};

/// Ipsilateral involvement rates for a mid-stage tumor, per reported level.
///
/// Super-levels are not sampled directly; they follow from their sub-levels
/// when the records are built.
const BASE_RATES: [(Lnl, f64); 9] = [
    (Lnl::Ia, 0.04),
    (Lnl::Ib, 0.10),
    (Lnl::IIa, 0.30),
    (Lnl::IIb, 0.12),
    (Lnl::III, 0.16),
    (Lnl::IV, 0.07),
    (Lnl::Va, 0.03),
    (Lnl::Vb, 0.04),
    (Lnl::VII, 0.03),
];

/// ICD-10 codes the generator assigns, spanning several subsite groups.
const SUBSITES: [&str; 6] = ["C01", "C09.0", "C09.9", "C10.2", "C04.0", "C05.1"];

/// Configuration for the synthetic cohort generator.
#[derive(Debug, Clone)]
pub struct SyntheticCohortConfig {
    /// Number of patients to generate.
    pub patients: usize,
    /// Dataset name assigned to every generated patient.
    pub dataset: String,
    /// Seed for reproducible cohorts, or `None` for a fresh one each run.
    pub seed: Option<u64>,
}

impl Default for SyntheticCohortConfig {
    fn default() -> Self {
        Self { patients: 200, dataset: "synthetic".to_string(), seed: None }
    }
}

/// Generate a cohort of synthetic patients.
///
/// Observations are drawn through the sensitivities and specificities of the
/// given registry, so combining them with the same registry reproduces the
/// hidden involvement at the expected rates.
#[must_use]
pub fn generate_cohort(registry: &ModalityRegistry, config: &SyntheticCohortConfig) -> Vec<Patient> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    (0..config.patients)
        .map(|index| generate_patient(registry, &config.dataset, index, &mut rng))
        .collect()
}

fn generate_patient(
    registry: &ModalityRegistry,
    dataset: &str,
    index: usize,
    rng: &mut StdRng,
) -> Patient {
    let mut patient = Patient::new(format!("P{index:04}"), dataset);

    patient.sex = if rng.random_bool(0.72) { Sex::Male } else { Sex::Female };
    patient.age = Some(rng.random_range(40..85));
    patient.diagnose_date = random_date(rng);
    patient.t_stage = random_t_stage(rng);
    patient.subsite = Some(SUBSITES[rng.random_range(0..SUBSITES.len())].to_string());

    // Attributes come with realistic missingness.
    patient.smoke = maybe(rng, 0.9, 0.65);
    patient.hpv = maybe(rng, 0.8, 0.55);
    patient.central = maybe(rng, 0.85, 0.05);
    patient.midext = maybe(rng, 0.85, 0.12);
    let surgery = rng.random_bool(0.4);
    patient.surgery = Some(surgery);

    // Hidden truth: involvement rates rise with T-stage, and contralateral
    // spread is rare unless the tumor crosses the midline.
    let stage_factor = 0.6 + 0.2 * f64::from(patient.t_stage.as_u8());
    let contra_factor = if patient.midext == Some(true) { 0.6 } else { 0.2 };
    let truth_ipsi = sample_involvement(rng, stage_factor);
    let truth_contra = sample_involvement(rng, stage_factor * contra_factor);

    for (side, truth) in [(Side::Ipsi, &truth_ipsi), (Side::Contra, &truth_contra)] {
        for modality in registry.modalities() {
            let observed = match modality.name.as_str() {
                "CT" => true,
                "MRI" => rng.random_bool(0.35),
                "FNA" => rng.random_bool(0.25),
                "pathology" => surgery,
                _ => false,
            };
            if !observed {
                continue;
            }

            // Pathology reports every dissected level; imaging leaves the
            // occasional level unassessed.
            let dropout = if modality.name == "pathology" { 0.0 } else { 0.08 };
            let mut pattern = InvolvementPattern::new();
            for &(lnl, _) in &BASE_RATES {
                if dropout > 0.0 && rng.random_bool(dropout) {
                    continue;
                }
                let involved = truth[lnl.index()];
                let positive = if involved {
                    rng.random_bool(modality.sens)
                } else {
                    !rng.random_bool(modality.spec)
                };
                pattern.set(lnl, Some(positive));
            }

            let mut record = DiagnosisRecord::new(&modality.name, side, pattern);
            record.date = patient
                .diagnose_date
                .and_then(|date| date.checked_add_days(Days::new(rng.random_range(0..30))));
            patient.add_diagnosis(record);
        }
    }

    patient
}

/// Sample a hidden involvement state over all levels.
fn sample_involvement(rng: &mut StdRng, factor: f64) -> [bool; Lnl::COUNT] {
    let mut truth = [false; Lnl::COUNT];
    for &(lnl, rate) in &BASE_RATES {
        truth[lnl.index()] = rng.random_bool((rate * factor).min(0.95));
    }
    for (sup, a, b) in Lnl::DIVISIBLE {
        truth[sup.index()] = truth[a.index()] || truth[b.index()];
    }
    truth
}

/// A value that is known with probability `known` and then true with
/// probability `yes`.
fn maybe(rng: &mut StdRng, known: f64, yes: f64) -> Option<bool> {
    rng.random_bool(known).then(|| rng.random_bool(yes))
}

fn random_t_stage(rng: &mut StdRng) -> TStage {
    let weights = [3, 18, 30, 29, 20];
    let mut draw = rng.random_range(0..100u32);
    for (index, &weight) in weights.iter().enumerate() {
        if draw < weight {
            return TStage::ALL[index];
        }
        draw -= weight;
    }
    TStage::T4
}

fn random_date(rng: &mut StdRng) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2015, 1, 1)
        .and_then(|epoch| epoch.checked_add_days(Days::new(rng.random_range(0..2000))))
}
