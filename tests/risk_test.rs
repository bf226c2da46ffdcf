//! End-to-end tests for posterior risk prediction.
//!
//! The fixtures are small tabulated models whose posteriors can be worked
//! out by hand, so every assertion pins an exact probability.

use std::sync::Arc;

use lnl_query::risk::{InMemoryModelStore, ModelRegion, TabulatedModel, state_involves};
use lnl_query::{
    DiagnosisSpec, Error, Lnl, ModalityRegistry, PatientCollection, ProgressionModel, QueryEngine,
    Side,
};

/// Two correlated regions: involvement of III is three times as likely
/// when II is involved.
///
/// States in bit order (II, III): 00 -> 0.5, 01 -> 0.1, 10 -> 0.3, 11 -> 0.1.
fn correlated_model() -> TabulatedModel {
    let regions = vec![
        ModelRegion::new(Side::Ipsi, Lnl::II),
        ModelRegion::new(Side::Ipsi, Lnl::III),
    ];
    TabulatedModel::new(regions, vec![0.5, 0.1, 0.3, 0.1]).unwrap()
}

fn engine_with_model(handle: &str, model: TabulatedModel) -> QueryEngine {
    let mut store = InMemoryModelStore::new();
    store.insert(handle, Arc::new(model));
    QueryEngine::new(
        ModalityRegistry::default_clinical(),
        Arc::new(PatientCollection::new()),
        Arc::new(store),
    )
}

#[test]
fn test_evidence_propagates_to_unspecified_regions() {
    let engine = engine_with_model("toy", correlated_model());

    // Unconditionally, P(III) = 0.1 + 0.1 = 0.2.
    let prior = engine.compute_risk("toy", &DiagnosisSpec::new(0.8, 0.8)).unwrap();
    let prior_iii = prior.get(Side::Ipsi, Lnl::III).unwrap();
    assert!((prior_iii - 0.2).abs() < 1e-12);

    // A positive finding in II pulls III up without specifying it:
    // weights become 0.5*0.2, 0.1*0.2, 0.3*0.8, 0.1*0.8 and
    // P(III | II+) = (0.02 + 0.08) / 0.44 = 5/22.
    let spec = DiagnosisSpec::new(0.8, 0.8).with_finding(Side::Ipsi, Lnl::II, true);
    let posterior = engine.compute_risk("toy", &spec).unwrap();
    let posterior_iii = posterior.get(Side::Ipsi, Lnl::III).unwrap();
    assert!((posterior_iii - 5.0 / 22.0).abs() < 1e-12);
    assert!(posterior_iii > prior_iii);
    assert!(posterior_iii < 1.0);

    // The specified region itself: P(II | II+) = 0.32 / 0.44 = 8/11.
    let posterior_ii = posterior.get(Side::Ipsi, Lnl::II).unwrap();
    assert!((posterior_ii - 8.0 / 11.0).abs() < 1e-12);
}

#[test]
fn test_involved_and_healthy_marginals_partition_the_posterior() {
    let model = correlated_model();
    let engine = engine_with_model("toy", model.clone());

    // (spec, per-state likelihood worked out by hand)
    let cases = [
        (DiagnosisSpec::new(0.8, 0.8), vec![1.0, 1.0, 1.0, 1.0]),
        (
            DiagnosisSpec::new(0.8, 0.8).with_finding(Side::Ipsi, Lnl::II, true),
            vec![0.2, 0.2, 0.8, 0.8],
        ),
        (
            DiagnosisSpec::new(0.9, 0.6)
                .with_finding(Side::Ipsi, Lnl::II, false)
                .with_finding(Side::Ipsi, Lnl::III, true),
            vec![0.24, 0.54, 0.04, 0.09],
        ),
    ];

    for (spec, likelihood) in cases {
        let prediction = engine.compute_risk("toy", &spec).unwrap();
        let posterior = model.posterior_joint(&likelihood).unwrap();

        for (index, (region, risk)) in prediction.iter().enumerate() {
            let involved: f64 = posterior
                .iter()
                .enumerate()
                .filter(|(state, _)| state_involves(*state, index, 2))
                .map(|(_, mass)| mass)
                .sum();
            let healthy: f64 = posterior
                .iter()
                .enumerate()
                .filter(|(state, _)| !state_involves(*state, index, 2))
                .map(|(_, mass)| mass)
                .sum();

            // The two marginals partition the posterior mass.
            assert!((involved + healthy - 1.0).abs() < 1e-9, "{region}");
            assert!((risk - involved).abs() < 1e-12, "{region}");
        }
    }
}

#[test]
fn test_risk_predictions_are_idempotent() {
    let engine = engine_with_model("toy", correlated_model());
    let spec = DiagnosisSpec::new(0.8, 0.8).with_finding(Side::Ipsi, Lnl::II, true);

    let first = engine.compute_risk("toy", &spec).unwrap();
    let second = engine.compute_risk("toy", &spec).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_handle_and_region_fail_cleanly() {
    let engine = engine_with_model("toy", correlated_model());
    let spec = DiagnosisSpec::new(0.8, 0.8);

    assert!(matches!(
        engine.compute_risk("absent", &spec),
        Err(Error::ModelUnavailable(handle, _)) if handle == "absent"
    ));

    let off_graph = spec.clone().with_finding(Side::Contra, Lnl::IV, true);
    assert!(matches!(
        engine.compute_risk("toy", &off_graph),
        Err(Error::ConfigurationMismatch(_))
    ));
}

#[test]
fn test_degenerate_evidence_is_reported_not_propagated() {
    // This prior rules out a healthy II entirely, so a perfectly reliable
    // negative finding there contradicts the model.
    let regions = vec![ModelRegion::new(Side::Ipsi, Lnl::II)];
    let model = TabulatedModel::new(regions, vec![0.0, 1.0]).unwrap();
    let engine = engine_with_model("degenerate", model);

    let spec = DiagnosisSpec::new(1.0, 1.0).with_finding(Side::Ipsi, Lnl::II, false);
    assert!(matches!(
        engine.compute_risk("degenerate", &spec),
        Err(Error::DegeneratePosterior(_))
    ));
}

#[test]
fn test_prediction_payload_uses_region_keys() {
    let engine = engine_with_model("toy", correlated_model());
    let prediction = engine.compute_risk("toy", &DiagnosisSpec::new(0.8, 0.8)).unwrap();

    let payload = serde_json::to_value(&prediction).unwrap();
    assert!((payload["ipsi_II"].as_f64().unwrap() - 0.4).abs() < 1e-12);
    assert!((payload["ipsi_III"].as_f64().unwrap() - 0.2).abs() < 1e-12);
}
