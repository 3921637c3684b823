//! CSV and JSON writers for the pipeline tables
//!
//! Missing values are written as empty cells. Floats use the shortest
//! round-trip formatting, so identical runs produce identical bytes.

use crate::pipeline::correlation::CorrelationMatrix;
use crate::pipeline::{PipelineOutput, RunReport};
use crate::types::{ClusterSummary, ClusteredTract, MapRow, ScoredTract, TractRecord};
use csv::Writer;
use ej_common::indicators::{
    column_renames, HOUSEHOLDS_COLUMN, IS_DAC_COLUMN, POPULATION_COLUMN, TRACT_COLUMN,
};
use ej_common::{ClusterFeature, Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MERGED_FILE: &str = "dacejssvi.csv";
pub const SCORED_FILE: &str = "cumburdej.csv";
pub const CLUSTERED_FILE: &str = "clusteredej.csv";
pub const SUMMARY_FILE: &str = "clustersumm.csv";
pub const MAP_FILE: &str = "mapej.csv";
pub const CORRELATION_FILE: &str = "ejcorr.csv";
pub const REPORT_FILE: &str = "run_report.json";

const VULNERABILITY_PERCENTILE: &str = "Vulnerability_Percentile";
const POLLUTION_SCORE: &str = "Pollution_Score";
const HAZARDPROX_SCORE: &str = "Hazardprox_Score";
const CUMULATIVE_BURDEN_SCORE: &str = "Cumulative_Burden_Score";
const WEIGHTED_BURDEN: &str = "Weighted_Burden";
const WEIGHTED_BURDEN_NORM: &str = "Weighted_Burden_Norm";
const CLUSTER: &str = "Cluster";

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Merged table: identity, counts, exposure indicators, flag, vulnerability
pub fn write_merged<W: Write>(sink: W, records: &[TractRecord]) -> Result<()> {
    let mut writer = Writer::from_writer(sink);

    writer.write_record(column_renames().iter().map(|(_, readable)| *readable))?;

    for record in records {
        let mut row = vec![
            record.tract.to_string(),
            record.population.to_string(),
            record.households.to_string(),
        ];
        row.extend(record.indicators.iter().map(|v| cell(*v)));
        row.push(record.is_dac().to_string());
        row.extend(record.vulnerability.iter().map(|v| cell(*v)));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_scored<W: Write>(sink: W, scored: &[ScoredTract]) -> Result<()> {
    let mut writer = Writer::from_writer(sink);
    writer.write_record([
        TRACT_COLUMN,
        POPULATION_COLUMN,
        HOUSEHOLDS_COLUMN,
        IS_DAC_COLUMN,
        VULNERABILITY_PERCENTILE,
        POLLUTION_SCORE,
        HAZARDPROX_SCORE,
        CUMULATIVE_BURDEN_SCORE,
        WEIGHTED_BURDEN,
        WEIGHTED_BURDEN_NORM,
    ])?;
    for s in scored {
        writer.write_record([
            s.tract.to_string(),
            s.population.to_string(),
            s.households.to_string(),
            s.is_dac.to_string(),
            cell(s.vulnerability_percentile),
            cell(s.pollution_score),
            cell(s.hazardprox_score),
            cell(s.cumulative_burden_score),
            cell(s.weighted_burden),
            cell(s.weighted_burden_norm),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Clustered tracts with their raw feature values and label
pub fn write_clustered<W: Write>(
    sink: W,
    features: &[ClusterFeature],
    tracts: &[ClusteredTract],
) -> Result<()> {
    let mut writer = Writer::from_writer(sink);

    let mut header = vec![TRACT_COLUMN];
    header.extend(features.iter().map(|f| f.name()));
    header.push(IS_DAC_COLUMN);
    header.push(CLUSTER);
    writer.write_record(&header)?;

    for tract in tracts {
        let mut row = vec![tract.tract.to_string()];
        row.extend(tract.features.iter().map(|v| v.to_string()));
        row.push(tract.is_dac.to_string());
        row.push(tract.cluster.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summaries<W: Write>(
    sink: W,
    features: &[ClusterFeature],
    summaries: &[ClusterSummary],
) -> Result<()> {
    let mut writer = Writer::from_writer(sink);

    let mut header = vec![CLUSTER, "Tract_Count"];
    header.extend(features.iter().map(|f| f.name()));
    header.push("Percent_DAC");
    writer.write_record(&header)?;

    for summary in summaries {
        let mut row = vec![summary.cluster.to_string(), summary.tract_count.to_string()];
        row.extend(summary.feature_means.iter().map(|v| v.to_string()));
        row.push(summary.percent_dac.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Condensed mapping table; an unclustered tract has an empty `Cluster` cell
pub fn write_map<W: Write>(sink: W, rows: &[MapRow]) -> Result<()> {
    let mut writer = Writer::from_writer(sink);
    writer.write_record([
        TRACT_COLUMN,
        IS_DAC_COLUMN,
        POLLUTION_SCORE,
        HAZARDPROX_SCORE,
        VULNERABILITY_PERCENTILE,
        CUMULATIVE_BURDEN_SCORE,
        WEIGHTED_BURDEN_NORM,
        CLUSTER,
    ])?;
    for r in rows {
        writer.write_record([
            r.tract.to_string(),
            r.is_dac.to_string(),
            cell(r.pollution_score),
            cell(r.hazardprox_score),
            cell(r.vulnerability_percentile),
            cell(r.cumulative_burden_score),
            cell(r.weighted_burden_norm),
            r.cluster.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Correlation matrix labelled with display labels on both axes
pub fn write_correlation<W: Write>(sink: W, matrix: &CorrelationMatrix) -> Result<()> {
    let mut writer = Writer::from_writer(sink);

    let mut header = vec![""];
    header.extend(matrix.features.iter().map(|f| f.label()));
    writer.write_record(&header)?;

    for (i, feature) in matrix.features.iter().enumerate() {
        let mut row = vec![feature.label().to_string()];
        row.extend((0..matrix.features.len()).map(|j| cell(matrix.get(i, j))));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report<W: Write>(mut sink: W, report: &RunReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut sink, report)?;
    writeln!(sink)?;
    sink.flush()?;
    Ok(())
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    let file = File::create(&path).map_err(|source| Error::File {
        path: path.display().to_string(),
        source,
    })?;
    Ok(BufWriter::new(file))
}

/// Write every output table into `dir`, creating it if needed
pub fn write_all(dir: &Path, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|source| Error::File {
        path: dir.display().to_string(),
        source,
    })?;

    let features = &output.clusters.features;
    write_merged(create(dir, MERGED_FILE)?, &output.merged)?;
    write_scored(create(dir, SCORED_FILE)?, &output.scored)?;
    write_clustered(create(dir, CLUSTERED_FILE)?, features, &output.clusters.tracts)?;
    write_summaries(create(dir, SUMMARY_FILE)?, features, &output.clusters.summaries)?;
    write_map(create(dir, MAP_FILE)?, &output.map)?;
    write_correlation(create(dir, CORRELATION_FILE)?, &output.correlation)?;
    write_report(create(dir, REPORT_FILE)?, &output.report)?;

    let written: Vec<PathBuf> = [
        MERGED_FILE,
        SCORED_FILE,
        CLUSTERED_FILE,
        SUMMARY_FILE,
        MAP_FILE,
        CORRELATION_FILE,
        REPORT_FILE,
    ]
    .iter()
    .map(|name| dir.join(name))
    .collect();
    info!(dir = %dir.display(), files = written.len(), "Outputs written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ej_common::{Designation, Indicator, TractId, VulnerabilityTheme};

    fn map_row(tract: &str, cluster: Option<usize>) -> MapRow {
        MapRow {
            tract: TractId::from(tract),
            is_dac: 1,
            pollution_score: Some(50.0),
            hazardprox_score: None,
            vulnerability_percentile: Some(12.5),
            cumulative_burden_score: None,
            weighted_burden_norm: None,
            cluster,
        }
    }

    #[test]
    fn test_map_writes_empty_cells_for_missing() {
        let mut buffer = Vec::new();
        write_map(&mut buffer, &[map_row("36005000100", None), map_row("36005000200", Some(0))])
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Tract,Is_DAC,Pollution_Score,Hazardprox_Score,Vulnerability_Percentile,Cumulative_Burden_Score,Weighted_Burden_Norm,Cluster"
        );
        assert_eq!(lines[1], "36005000100,1,50,,12.5,,,");
        assert_eq!(lines[2], "36005000200,1,50,,12.5,,,0");
    }

    #[test]
    fn test_merged_header_follows_rename_table() {
        let record = TractRecord {
            tract: TractId::from("36005000100"),
            population: 500,
            households: 200,
            designation: Designation::Designated,
            indicators: [Some(50.0); Indicator::COUNT],
            vulnerability: [None; VulnerabilityTheme::COUNT],
        };
        let mut buffer = Vec::new();
        write_merged(&mut buffer, &[record]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        let expected: Vec<&str> = column_renames().into_iter().map(|(_, to)| to).collect();
        assert_eq!(lines[0], expected.join(","));
        assert!(lines[0].starts_with("Tract,Population,Households,PM25,Ozone,"));
        assert!(lines[0].contains(",Traffic_Prox,Is_DAC,Socioecon_Percentile,"));
        assert_eq!(lines[1], format!("36005000100,500,200,{}1,,,,,", "50,".repeat(12)));
    }

    #[test]
    fn test_summary_header_lists_features() {
        let features = vec![ClusterFeature::Population, ClusterFeature::Exposure(Indicator::No2)];
        let summaries = vec![ClusterSummary {
            cluster: 0,
            tract_count: 2,
            feature_means: vec![1500.0, 42.3],
            percent_dac: 50.0,
        }];
        let mut buffer = Vec::new();
        write_summaries(&mut buffer, &features, &summaries).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "Cluster,Tract_Count,Population,NO2,Percent_DAC\n0,2,1500,42.3,50\n"
        );
    }

    #[test]
    fn test_correlation_uses_display_labels() {
        let matrix = CorrelationMatrix {
            features: vec![
                ClusterFeature::Exposure(Indicator::Pm25),
                ClusterFeature::Exposure(Indicator::DieselPm),
            ],
            coefficients: vec![vec![Some(1.0), Some(-0.5)], vec![Some(-0.5), None]],
        };
        let mut buffer = Vec::new();
        write_correlation(&mut buffer, &matrix).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, ",PM2.5,Diesel PM\nPM2.5,1,-0.5\nDiesel PM,-0.5,\n");
    }
}
