//! Tests for evidence combination across a whole cohort.
//!
//! These run small, hand-built cohorts through the query engine and check
//! the verdict counts each combination policy produces, plus the algebraic
//! properties the policies guarantee.

use std::sync::Arc;

use itertools::Itertools;

use lnl_query::combine::Observation;
use lnl_query::risk::InMemoryModelStore;
use lnl_query::{
    CohortQuery, CombinationPolicy, DiagnosisRecord, InvolvementPattern, Lnl, Modality,
    ModalityRegistry, Patient, PatientCollection, QueryEngine, Side, Verdict,
};

/// Registry with just the two modalities the example cohorts use.
fn imaging_registry() -> ModalityRegistry {
    ModalityRegistry::new(vec![
        Modality::new("MRI", 0.9, 0.8, 1),
        Modality::new("CT", 0.85, 0.75, 2),
    ])
    .unwrap()
}

fn patient_with_records(
    id: usize,
    records: &[(&str, Option<bool>)],
) -> Patient {
    let mut patient = Patient::new(format!("p{id}"), "cohort");
    for &(modality, value) in records {
        let mut pattern = InvolvementPattern::new();
        pattern.set(Lnl::II, value);
        patient.add_diagnosis(DiagnosisRecord::new(modality, Side::Ipsi, pattern));
    }
    patient
}

fn engine_over(registry: ModalityRegistry, patients: Vec<Patient>) -> QueryEngine {
    QueryEngine::new(
        registry,
        Arc::new(PatientCollection::from_patients(patients)),
        Arc::new(InMemoryModelStore::new()),
    )
}

/// Cohort of 10: six MRI-positive in level II, four without any record.
fn mri_cohort() -> Vec<Patient> {
    (0..10)
        .map(|id| {
            if id < 6 {
                patient_with_records(id, &[("MRI", Some(true))])
            } else {
                patient_with_records(id, &[])
            }
        })
        .collect()
}

#[test]
fn test_or_combination_counts() {
    let engine = engine_over(imaging_registry(), mri_cohort());

    let mut query = CohortQuery::new();
    query.policy = CombinationPolicy::Or;
    let stats = engine.query_cohort(&query).unwrap();

    let counts = stats.ipsi.get(Lnl::II);
    assert_eq!(stats.total, 10);
    assert_eq!(counts.involved, 6);
    assert_eq!(counts.healthy, 0);
    assert_eq!(counts.unknown, 4);
}

#[test]
fn test_and_combination_resolves_disagreement_to_healthy() {
    // Same cohort, but CT now reports negative for two of the six
    // MRI-positive patients and for all four without an MRI reading.
    let patients = (0..10)
        .map(|id| {
            if id < 4 {
                patient_with_records(id, &[("MRI", Some(true))])
            } else if id < 6 {
                patient_with_records(id, &[("MRI", Some(true)), ("CT", Some(false))])
            } else {
                patient_with_records(id, &[("CT", Some(false))])
            }
        })
        .collect();
    let engine = engine_over(imaging_registry(), patients);

    let mut query = CohortQuery::new();
    query.policy = CombinationPolicy::And;
    let stats = engine.query_cohort(&query).unwrap();

    let counts = stats.ipsi.get(Lnl::II);
    assert_eq!(counts.involved, 4);
    assert_eq!(counts.healthy, 6);
    assert_eq!(counts.unknown, 0);
}

#[test]
fn test_max_llh_weighs_reliabilities() {
    // Positive MRI vs negative CT: the involvement likelihood is
    // 0.9 * (1 - 0.85) = 0.135, the healthy one (1 - 0.8) * 0.75 = 0.15,
    // so healthy wins by a narrow margin.
    let patients = vec![patient_with_records(
        0,
        &[("MRI", Some(true)), ("CT", Some(false))],
    )];
    let engine = engine_over(imaging_registry(), patients);

    let mut query = CohortQuery::new();
    query.policy = CombinationPolicy::MaxLlh;
    let stats = engine.query_cohort(&query).unwrap();

    let counts = stats.ipsi.get(Lnl::II);
    assert_eq!(counts.healthy, 1);
    assert_eq!(counts.involved, 0);
}

#[test]
fn test_or_is_monotonic_in_positives() {
    let registry = imaging_registry();
    let mri = registry.get("MRI").unwrap();
    let ct = registry.get("CT").unwrap();

    let base_sets: Vec<Vec<Observation<'_>>> = vec![
        vec![],
        vec![Observation::new(ct, Some(false))],
        vec![Observation::new(ct, None)],
        vec![Observation::new(ct, Some(false)), Observation::new(mri, None)],
        vec![Observation::new(ct, Some(true))],
    ];

    for base in base_sets {
        let before = CombinationPolicy::Or.combine(&base);
        let mut extended = base.clone();
        extended.push(Observation::new(mri, Some(true)));
        let after = CombinationPolicy::Or.combine(&extended);

        // One more positive always lands on involved, wherever we started.
        assert_eq!(after, Verdict::Involved);
        if before == Verdict::Involved {
            assert_eq!(after, before);
        }
    }
}

#[test]
fn test_and_never_unknown_with_only_negatives() {
    let registry = imaging_registry();
    let mri = registry.get("MRI").unwrap();
    let ct = registry.get("CT").unwrap();

    let sets: Vec<Vec<Observation<'_>>> = vec![
        vec![Observation::new(ct, Some(false))],
        vec![Observation::new(ct, Some(false)), Observation::new(mri, None)],
        vec![Observation::new(ct, Some(false)), Observation::new(mri, Some(false))],
    ];

    for set in sets {
        assert_eq!(CombinationPolicy::And.combine(&set), Verdict::Healthy);
    }
}

#[test]
fn test_max_llh_is_order_invariant() {
    let registry = ModalityRegistry::new(vec![
        Modality::new("MRI", 0.9, 0.8, 1),
        Modality::new("CT", 0.85, 0.75, 2),
        Modality::new("PET", 0.79, 0.86, 3),
        Modality::new("FNA", 0.8, 0.98, 4),
    ])
    .unwrap();

    let observations: Vec<Observation<'_>> = registry
        .modalities()
        .iter()
        .zip([Some(true), Some(false), Some(true), None])
        .map(|(modality, value)| Observation::new(modality, value))
        .collect();

    let reference = CombinationPolicy::MaxLlh.combine(&observations);
    for permutation in observations.iter().copied().permutations(observations.len()) {
        assert_eq!(CombinationPolicy::MaxLlh.combine(&permutation), reference);
    }
}

#[test]
fn test_rank_prefers_the_most_trusted_reading() {
    let registry = imaging_registry();
    let mri = registry.get("MRI").unwrap();
    let ct = registry.get("CT").unwrap();

    // MRI outranks CT here, so its reading wins regardless of order.
    let observations =
        vec![Observation::new(ct, Some(true)), Observation::new(mri, Some(false))];
    assert_eq!(CombinationPolicy::Rank.combine(&observations), Verdict::Healthy);

    // An explicitly unknown top-ranked reading masks lower-ranked ones.
    let observations = vec![Observation::new(ct, Some(true)), Observation::new(mri, None)];
    assert_eq!(CombinationPolicy::Rank.combine(&observations), Verdict::Unknown);
}

#[test]
fn test_later_record_replaces_earlier_one() {
    // The same modality reports level II twice; only the second reading
    // counts, so OR does not see the retracted positive.
    let patients = vec![patient_with_records(
        0,
        &[("CT", Some(true)), ("CT", Some(false))],
    )];
    let engine = engine_over(imaging_registry(), patients);

    let mut query = CohortQuery::new();
    query.policy = CombinationPolicy::Or;
    let stats = engine.query_cohort(&query).unwrap();
    assert_eq!(stats.ipsi.get(Lnl::II).healthy, 1);
}
