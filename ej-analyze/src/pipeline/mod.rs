// Pipeline Module - Reconcile → Merge → Score → Cluster → Project
//
// Each stage is a pure transform over the previous stage's table. Nothing is
// written until every stage has succeeded.

pub mod clusterer;
pub mod correlation;
pub mod merger;
pub mod projector;
pub mod reconciler;
pub mod scorer;

use crate::types::{
    CrosswalkRow, DesignationRow, ExposureRow, JoinReport, MapRow, ScoredTract, TractRecord,
    VulnerabilityRow,
};
use clusterer::{ClusterOutcome, KMeansParams};
use correlation::CorrelationMatrix;
use ej_common::config::PipelineConfig;
use ej_common::{Result, TractId};
use scorer::BurdenRank;
use serde::Serialize;
use tracing::info;

/// Source tables as read from disk
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub exposure: Vec<ExposureRow>,
    pub vulnerability: Vec<VulnerabilityRow>,
    pub designations: Vec<DesignationRow>,
    pub crosswalk: Vec<CrosswalkRow>,
}

/// Every table and diagnostic produced by one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub merged: Vec<TractRecord>,
    pub scored: Vec<ScoredTract>,
    pub clusters: ClusterOutcome,
    pub map: Vec<MapRow>,
    pub correlation: CorrelationMatrix,
    pub report: RunReport,
}

/// Run diagnostics, written as `run_report.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub joins: Vec<JoinReport>,
    pub merged_tracts: usize,
    pub designated_tracts: usize,
    pub dropped_non_residential: Vec<TractId>,
    pub excluded_from_clustering: Vec<TractId>,
    pub cluster_sizes: Vec<usize>,
    pub inertia: f64,
    pub top_burden: Vec<BurdenRank>,
}

/// Run every stage in order over in-memory tables
pub fn run_pipeline(inputs: &PipelineInputs, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let reconciliation = reconciler::reconcile(&inputs.designations, &inputs.crosswalk)?;

    merger::validate_exposure_scale(&inputs.exposure)?;
    let vulnerability =
        merger::rescale_vulnerability(&inputs.vulnerability, config.svi_missing_sentinel)?;
    let merged = merger::merge(&inputs.exposure, &reconciliation.designations, &vulnerability)?;

    let scored = scorer::score(
        &merged.records,
        &config.pollution_indicators,
        &config.hazard_indicators,
    );
    let top = scorer::top_burden(&scored, config.top_n);
    for (rank, entry) in top.iter().enumerate() {
        info!(
            rank = rank + 1,
            tract = %entry.tract,
            cumulative_burden_score = entry.cumulative_burden_score,
            is_dac = entry.is_dac,
            "Top burden tract"
        );
    }

    let clusters = clusterer::cluster(
        &merged.records,
        &config.cluster_features,
        &KMeansParams::from_config(config),
    )?;
    let map = projector::project(&scored, &clusters.tracts);
    let correlation = correlation::correlate(&merged.records, &config.correlation_features);

    let report = RunReport {
        joins: vec![
            reconciliation.join.clone(),
            merged.designation_join.clone(),
            merged.vulnerability_join.clone(),
        ],
        merged_tracts: merged.records.len(),
        designated_tracts: merged
            .records
            .iter()
            .filter(|r| r.designation.is_designated())
            .count(),
        dropped_non_residential: merged.dropped_non_residential.clone(),
        excluded_from_clustering: clusters.excluded.clone(),
        cluster_sizes: clusters.cluster_sizes(),
        inertia: clusters.inertia,
        top_burden: top,
    };

    Ok(PipelineOutput {
        merged: merged.records,
        scored,
        clusters,
        map,
        correlation,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ej_common::{ClusterFeature, Designation, Error, Indicator, VulnerabilityTheme};

    fn exposure(tract: &str, population: u64, households: u64, value: f64) -> ExposureRow {
        ExposureRow {
            tract: TractId::from(tract),
            population,
            households,
            indicators: [Some(value); Indicator::COUNT],
        }
    }

    fn svi(tract: &str, value: f64) -> VulnerabilityRow {
        VulnerabilityRow {
            tract: TractId::from(tract),
            themes: [Some(value); VulnerabilityTheme::COUNT],
        }
    }

    fn designation(tract: &str, status: &str) -> DesignationRow {
        DesignationRow {
            legacy_tract: TractId::from(tract),
            status: status.to_string(),
        }
    }

    fn link(legacy: &str, current: &str) -> CrosswalkRow {
        CrosswalkRow {
            legacy_tract: TractId::from(legacy),
            current_tract: TractId::from(current),
        }
    }

    fn single_tract_inputs() -> PipelineInputs {
        PipelineInputs {
            exposure: vec![exposure("C", 500, 200, 50.0)],
            vulnerability: vec![svi("C", 0.5)],
            designations: vec![
                designation("A", Designation::DESIGNATED_TEXT),
                designation("B", Designation::NOT_DESIGNATED_TEXT),
            ],
            crosswalk: vec![link("A", "C"), link("B", "C")],
        }
    }

    #[test]
    fn test_single_tract_end_to_end() {
        let config = PipelineConfig {
            clusters: 1,
            ..PipelineConfig::default()
        };
        let output = run_pipeline(&single_tract_inputs(), &config).unwrap();

        let c = &output.scored[0];
        assert_eq!(c.is_dac, 1);
        assert_eq!(c.pollution_score, Some(50.0));
        assert_eq!(c.hazardprox_score, Some(50.0));
        assert_eq!(c.vulnerability_percentile, Some(50.0));
        assert_eq!(c.cumulative_burden_score, Some(50.0));
        assert_eq!(c.weighted_burden, Some(25000.0));
        assert_eq!(c.weighted_burden_norm, Some(1.0));
        assert_eq!(output.map[0].cluster, Some(0));
        assert_eq!(output.report.joins.len(), 3);
        assert_eq!(output.report.top_burden.len(), 1);
    }

    #[test]
    fn test_non_residential_tract_is_dropped_everywhere() {
        let mut inputs = single_tract_inputs();
        inputs.exposure.push(exposure("PARK", 0, 0, 10.0));
        let config = PipelineConfig {
            clusters: 1,
            ..PipelineConfig::default()
        };

        let output = run_pipeline(&inputs, &config).unwrap();
        assert_eq!(output.report.dropped_non_residential, vec![TractId::from("PARK")]);
        assert!(output.scored.iter().all(|s| s.tract.as_str() != "PARK"));
        assert!(output.map.iter().all(|m| m.tract.as_str() != "PARK"));
    }

    #[test]
    fn test_configured_correlation_features() {
        let overall = ClusterFeature::Vulnerability(VulnerabilityTheme::Overall);
        let config = PipelineConfig {
            clusters: 1,
            correlation_features: vec![overall, ClusterFeature::Exposure(Indicator::Pm25)],
            ..PipelineConfig::default()
        };
        let output = run_pipeline(&single_tract_inputs(), &config).unwrap();
        assert_eq!(output.correlation.features[0], overall);
        assert_eq!(output.correlation.coefficients.len(), 2);
        assert_eq!(overall.label(), "Overall Vulnerability Index");
    }

    #[test]
    fn test_too_many_clusters_fails() {
        let err = run_pipeline(&single_tract_inputs(), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::ClusteringPrecondition { usable_rows: 1, k: 4 }
        ));
    }

    #[test]
    fn test_invalid_config_stops_before_any_stage() {
        let config = PipelineConfig {
            clusters: 0,
            ..PipelineConfig::default()
        };
        let mut inputs = single_tract_inputs();
        inputs.crosswalk.clear();
        assert!(matches!(run_pipeline(&inputs, &config), Err(Error::Config(_))));
    }
}
