use std::sync::Arc;

use log::info;

use lnl_query::risk::{InMemoryModelStore, ModelRegion, TabulatedModel};
use lnl_query::synthetic::{SyntheticCohortConfig, generate_cohort};
use lnl_query::{
    CohortQuery, CombinationPolicy, DiagnosisSpec, Lnl, ModalityRegistry, PatientCollection,
    QueryEngine, Side, Toggle,
};

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Build a reproducible synthetic cohort to query against.
    let registry = ModalityRegistry::default_clinical();
    let config = SyntheticCohortConfig {
        patients: 300,
        dataset: "demo".to_string(),
        seed: Some(7),
    };
    let cohort = generate_cohort(&registry, &config);
    info!("Generated {} synthetic patients", cohort.len());

    let mut models = InMemoryModelStore::new();
    models.insert("demo_oropharynx", Arc::new(demo_model()?));

    let engine = QueryEngine::new(
        registry,
        Arc::new(PatientCollection::from_patients(cohort)),
        Arc::new(models),
    );

    // Example 1: statistics over the whole cohort under the default policy.
    let stats = engine.query_cohort(&CohortQuery::new())?;
    println!("{}", stats.generate_summary());

    // Example 2: restrict to patients with involved ipsilateral level II,
    // trusting only the imaging modalities.
    let mut query = CohortQuery::new();
    query.modalities = Some(vec!["CT".to_string(), "MRI".to_string()]);
    query.policy = CombinationPolicy::Rank;
    query.criteria.ipsi.set(Lnl::II, Toggle::Yes);
    let stats = engine.query_cohort(&query)?;
    println!(
        "\nPatients with involved ipsilateral level II on imaging: {}",
        stats.total
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&stats.ipsi)?
    );

    // Example 3: posterior risks given a hypothetical positive CT finding.
    let spec = DiagnosisSpec::new(0.81, 0.76).with_finding(Side::Ipsi, Lnl::II, true);
    let prediction = engine.compute_risk("demo_oropharynx", &spec)?;
    println!("\nRisks given a positive level II CT finding: {prediction}");

    Ok(())
}

/// A small hand-tabulated model over the three main ipsilateral levels.
///
/// Mass decays with the number of involved levels and skip metastases are
/// rare, which is the shape trained progression models produce.
fn demo_model() -> anyhow::Result<TabulatedModel> {
    let regions = vec![
        ModelRegion::new(Side::Ipsi, Lnl::II),
        ModelRegion::new(Side::Ipsi, Lnl::III),
        ModelRegion::new(Side::Ipsi, Lnl::IV),
    ];
    // State order: II is the most significant bit, IV the least.
    let prior = vec![0.52, 0.005, 0.02, 0.005, 0.27, 0.01, 0.12, 0.05];
    Ok(TabulatedModel::new(regions, prior)?)
}
